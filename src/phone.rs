//! Phone one-time-code login.
//!
//! The code is entered into six single-digit cells. Filling the sixth cell
//! verifies immediately; a rejected code empties the cells and puts focus
//! back on the first one while the phone number stays as entered.

use tracing::debug;

use crate::api::{CodeDispatch, CodePurpose, DeliveryMethod};
use crate::error::ApiError;
use crate::navigation::Destination;
use crate::oauth::AuthorizationRequest;
use crate::session::{Credentials, Session};

pub const OTP_LENGTH: usize = 6;
/// Country prefix the phone field starts with.
pub const PHONE_PREFIX: &str = "+998";

/// Six-cell OTP entry with a focused cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpInput {
    cells: [Option<char>; OTP_LENGTH],
    focus: usize,
}

impl OtpInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type `text` into cell `index`.
    ///
    /// Non-digits are ignored and only the last digit is kept. Focus moves
    /// to the next cell. Returns false when nothing changed.
    pub fn input(&mut self, index: usize, text: &str) -> bool {
        if index >= OTP_LENGTH {
            return false;
        }
        let Some(digit) = text.chars().filter(char::is_ascii_digit).last() else {
            return false;
        };
        self.cells[index] = Some(digit);
        self.focus = (index + 1).min(OTP_LENGTH - 1);
        true
    }

    /// Backspace in cell `index`: an empty cell hands focus to its left
    /// neighbour, a filled one is emptied.
    pub fn backspace(&mut self, index: usize) {
        if index >= OTP_LENGTH {
            return;
        }
        if self.cells[index].is_none() && index > 0 {
            self.focus = index - 1;
        } else {
            self.cells[index] = None;
            self.focus = index;
        }
    }

    /// Spread pasted digits over the cells from the first one.
    pub fn paste(&mut self, text: &str) -> bool {
        let digits: Vec<char> = text.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return false;
        }
        for (cell, digit) in self.cells.iter_mut().zip(digits.iter()) {
            *cell = Some(*digit);
        }
        self.focus = digits.len().min(OTP_LENGTH - 1);
        true
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The full code once every cell is filled.
    pub fn code(&self) -> Option<String> {
        self.cells.iter().copied().collect()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn cells(&self) -> &[Option<char>; OTP_LENGTH] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneStep {
    EnterPhone,
    EnterCode,
}

/// Phone login flow: request a code, then enter it.
pub struct PhoneLogin<'a> {
    session: &'a Session,
    pending: Option<AuthorizationRequest>,
    phone: String,
    step: PhoneStep,
    otp: OtpInput,
    delivery: Option<DeliveryMethod>,
    telegram_link: Option<String>,
}

impl<'a> PhoneLogin<'a> {
    pub fn new(session: &'a Session, pending: Option<AuthorizationRequest>) -> Self {
        Self {
            session,
            pending,
            phone: PHONE_PREFIX.to_string(),
            step: PhoneStep::EnterPhone,
            otp: OtpInput::new(),
            delivery: None,
            telegram_link: None,
        }
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn step(&self) -> PhoneStep {
        self.step
    }

    pub fn otp(&self) -> &OtpInput {
        &self.otp
    }

    pub fn delivery(&self) -> Option<DeliveryMethod> {
        self.delivery
    }

    /// Bot chat link that delivers the code over Telegram.
    pub fn telegram_link(&self) -> Option<&str> {
        self.telegram_link.as_deref()
    }

    /// Ask the backend to send a login code to `phone`.
    ///
    /// Whitespace is stripped. Resets any code typed so far. On failure the
    /// flow stays on the phone step with the number kept.
    pub async fn request_code(&mut self, phone: &str) -> Result<CodeDispatch, ApiError> {
        self.phone = phone.trim().to_string();
        let target = normalize_phone(phone).ok_or_else(|| ApiError::Validation {
            detail: Some("phone number is required".to_string()),
        })?;
        self.otp.clear();
        self.telegram_link = None;

        let dispatch = self
            .session
            .client()
            .send_code(&target, CodePurpose::Login)
            .await?;
        debug!(method = ?dispatch.method, "login code requested");
        self.delivery = Some(dispatch.method);
        self.telegram_link = dispatch.telegram_url.clone();
        self.step = PhoneStep::EnterCode;
        Ok(dispatch)
    }

    /// Type into one OTP cell; the sixth digit triggers verification.
    ///
    /// `Ok(None)` means the code is not complete yet.
    pub async fn type_digit(
        &mut self,
        index: usize,
        text: &str,
    ) -> Result<Option<Destination>, ApiError> {
        if self.step != PhoneStep::EnterCode || !self.otp.input(index, text) {
            return Ok(None);
        }
        self.verify_when_complete().await
    }

    /// Paste a code; a complete paste triggers verification.
    pub async fn paste(&mut self, text: &str) -> Result<Option<Destination>, ApiError> {
        if self.step != PhoneStep::EnterCode || !self.otp.paste(text) {
            return Ok(None);
        }
        self.verify_when_complete().await
    }

    pub fn backspace(&mut self, index: usize) {
        self.otp.backspace(index);
    }

    /// Empty every cell and refocus the first one.
    pub fn clear_code(&mut self) {
        self.otp.clear();
    }

    async fn verify_when_complete(&mut self) -> Result<Option<Destination>, ApiError> {
        if self.otp.code().is_none() {
            return Ok(None);
        }
        self.verify().await.map(Some)
    }

    /// Exchange phone and code for a session.
    ///
    /// A rejected code clears the cells and refocuses the first one; the
    /// phone number is kept.
    pub async fn verify(&mut self) -> Result<Destination, ApiError> {
        let code = self.otp.code().ok_or_else(|| ApiError::Validation {
            detail: Some(format!("enter all {OTP_LENGTH} digits of the code")),
        })?;
        let phone = normalize_phone(&self.phone).unwrap_or_default();
        let credentials = Credentials::Phone { phone, code };
        match self.session.login(&credentials, self.pending.as_ref()).await {
            Ok(destination) => Ok(destination),
            Err(err) => {
                self.otp.clear();
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for PhoneLogin<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhoneLogin")
            .field("phone", &self.phone)
            .field("step", &self.step)
            .field("delivery", &self.delivery)
            .field("telegram_link", &self.telegram_link)
            .finish_non_exhaustive()
    }
}

/// Strip whitespace; a bare country prefix counts as no number.
fn normalize_phone(raw: &str) -> Option<String> {
    let phone: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
    (!phone.is_empty() && phone != PHONE_PREFIX).then_some(phone)
}
