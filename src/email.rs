//! Outbound transactional email.
//!
//! One SMTP transport shared by the whole app: OTP mails for the admin
//! password-reset flow and the new-booking notification to the homestay
//! inbox. Delivery is awaited inline; a failure maps to [`AppError::Mail`]
//! and surfaces as a 500 with a generic message.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::env;

use crate::api::{AppError, AppResult};
use crate::otp::OTP_TTL_MINUTES;

/// Shared SMTP mailer.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    admin_inbox: Mailbox,
}

/// Data rendered into the new-booking notification mail.
pub struct BookingNotification {
    pub reference: String,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub room_name: String,
    pub room_type: String,
    pub check_in: String,
    pub check_out: String,
    pub nights: i32,
    pub guests: i32,
    pub number_of_rooms: i32,
    pub total_price: f64,
}

impl Mailer {
    /// Builds the mailer from `SMTP_HOST`, `EMAIL_USER`, `EMAIL_PASSWORD`
    /// and optionally `ADMIN_EMAIL` (defaults to the sending account).
    pub fn from_env() -> AppResult<Mailer> {
        let host = env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string());
        let user = env::var("EMAIL_USER")
            .map_err(|_| AppError::Internal("EMAIL_USER is not set".to_string()))?;
        let password = env::var("EMAIL_PASSWORD")
            .map_err(|_| AppError::Internal("EMAIL_PASSWORD is not set".to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .map_err(|e| AppError::Internal(format!("SMTP configuration error: {}", e)))?
            .credentials(Credentials::new(user.clone(), password))
            .build();

        let from: Mailbox = user
            .parse()
            .map_err(|_| AppError::Internal("EMAIL_USER is not a valid address".to_string()))?;

        let admin_inbox = match env::var("ADMIN_EMAIL") {
            Ok(address) => address
                .parse()
                .map_err(|_| AppError::Internal("ADMIN_EMAIL is not a valid address".to_string()))?,
            Err(_) => from.clone(),
        };

        Ok(Mailer {
            transport,
            from,
            admin_inbox,
        })
    }

    async fn send_html(&self, to: Mailbox, subject: &str, html: String) -> Result<(), String> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| format!("building email: {}", e))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| format!("sending email: {}", e))?;

        Ok(())
    }

    /// Sends the password-reset OTP to an administrator.
    pub async fn send_password_reset_otp(
        &self,
        email: &str,
        name: &str,
        otp: &str,
        resent: bool,
    ) -> AppResult<()> {
        let to: Mailbox = email
            .parse()
            .map_err(|_| AppError::Validation("Please enter a valid email address".to_string()))?;

        let (subject, html) = if resent {
            (
                "Password Reset OTP (Resent) - Aamantran Homestay Admin",
                otp_resent_template(name, otp),
            )
        } else {
            (
                "Password Reset OTP - Aamantran Homestay Admin",
                otp_template(name, otp),
            )
        };

        match self.send_html(to, subject, html).await {
            Ok(()) => {
                tracing::info!(email = %email, "OTP email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(email = %email, error = %e, "OTP email failed");
                Err(AppError::Mail(
                    "Failed to send OTP email. Please try again.".to_string(),
                ))
            }
        }
    }

    /// Notifies the homestay inbox about a freshly created booking.
    pub async fn send_booking_notification(&self, booking: &BookingNotification) -> AppResult<()> {
        let subject = format!("New Booking Received - {}", booking.reference);
        let html = booking_notification_template(booking);

        match self.send_html(self.admin_inbox.clone(), &subject, html).await {
            Ok(()) => {
                tracing::info!(reference = %booking.reference, "Booking notification sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(reference = %booking.reference, error = %e, "Booking notification failed");
                Err(AppError::Mail(
                    "Booking was created but the notification email failed".to_string(),
                ))
            }
        }
    }
}

fn otp_template(name: &str, otp: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #2563eb;">Password Reset Request</h2>
  <p>Hello {name},</p>
  <p>You have requested to reset your password for Aamantran Homestay Admin Panel.</p>
  <div style="background-color: #f3f4f6; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <p style="margin: 0; font-size: 14px; color: #6b7280;">Your OTP is:</p>
    <h1 style="margin: 10px 0; color: #2563eb; font-size: 32px; letter-spacing: 5px;">{otp}</h1>
  </div>
  <p style="color: #ef4444; font-weight: bold;">This OTP will expire in {ttl} minutes.</p>
  <p style="color: #6b7280; font-size: 14px;">If you didn't request this, please ignore this email and your password will remain unchanged.</p>
  <hr style="border: none; border-top: 1px solid #e5e7eb; margin: 20px 0;">
  <p style="color: #9ca3af; font-size: 12px;">This is an automated email from Aamantran Homestay Admin System.</p>
</div>"#,
        name = name,
        otp = otp,
        ttl = OTP_TTL_MINUTES,
    )
}

fn otp_resent_template(name: &str, otp: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #2563eb;">Password Reset OTP</h2>
  <p>Hello {name},</p>
  <p>Here is your new OTP for password reset:</p>
  <div style="background-color: #f3f4f6; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <h1 style="margin: 10px 0; color: #2563eb; font-size: 32px; letter-spacing: 5px;">{otp}</h1>
  </div>
  <p style="color: #ef4444; font-weight: bold;">This OTP will expire in {ttl} minutes.</p>
</div>"#,
        name = name,
        otp = otp,
        ttl = OTP_TTL_MINUTES,
    )
}

fn booking_notification_template(b: &BookingNotification) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #2563eb;">New Booking Received</h2>
  <p>A new booking has been placed through the website.</p>
  <table style="width: 100%; border-collapse: collapse; margin: 20px 0;">
    <tr><td style="padding: 8px; color: #6b7280;">Reference</td><td style="padding: 8px;">{reference}</td></tr>
    <tr><td style="padding: 8px; color: #6b7280;">Guest</td><td style="padding: 8px;">{guest_name} ({guest_email}, {guest_phone})</td></tr>
    <tr><td style="padding: 8px; color: #6b7280;">Room</td><td style="padding: 8px;">{room_name} - {room_type}</td></tr>
    <tr><td style="padding: 8px; color: #6b7280;">Stay</td><td style="padding: 8px;">{check_in} to {check_out} ({nights} nights)</td></tr>
    <tr><td style="padding: 8px; color: #6b7280;">Party</td><td style="padding: 8px;">{guests} guests, {rooms} room(s)</td></tr>
    <tr><td style="padding: 8px; color: #6b7280;">Total</td><td style="padding: 8px;">{total:.2}</td></tr>
  </table>
  <p style="color: #9ca3af; font-size: 12px;">This is an automated email from Aamantran Homestay Admin System.</p>
</div>"#,
        reference = b.reference,
        guest_name = b.guest_name,
        guest_email = b.guest_email,
        guest_phone = b.guest_phone,
        room_name = b.room_name,
        room_type = b.room_type,
        check_in = b.check_in,
        check_out = b.check_out,
        nights = b.nights,
        guests = b.guests,
        rooms = b.number_of_rooms,
        total = b.total_price,
    )
}
