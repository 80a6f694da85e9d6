//! Mail templates
//!
//! Built-in HTML bodies for the account flows.

/// A renderable account email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    /// Sent after sign-up with the verification link
    EmailVerification { username: String, link: String },
    /// Sent once the account has been verified
    EmailVerified { username: String },
    /// One-time code for a password reset
    PasswordResetCode { username: String, code: u32 },
}

impl Template {
    pub fn subject(&self) -> &'static str {
        match self {
            Template::EmailVerification { .. } => "Email Verification Required",
            Template::EmailVerified { .. } => "Email Verification Success",
            Template::PasswordResetCode { .. } => "OTP For Password Reset",
        }
    }

    pub fn render(&self) -> String {
        match self {
            Template::EmailVerification { username, link } => format!(
                "<p>Hi {},</p>\
                 <p>Please confirm your email address to activate your account.</p>\
                 <p><a href=\"{}\">Verify my account</a></p>",
                escape(username),
                escape(link)
            ),
            Template::EmailVerified { username } => format!(
                "<p>Hi {},</p><p>Your email address has been verified. Welcome aboard!</p>",
                escape(username)
            ),
            Template::PasswordResetCode { username, code } => format!(
                "<p>Hi {},</p>\
                 <p>Your password reset code is <strong>{:06}</strong>.</p>\
                 <p>If you did not ask to reset your password, ignore this email.</p>",
                escape(username),
                code
            ),
        }
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
