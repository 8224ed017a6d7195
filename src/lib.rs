pub mod config;
pub mod contact;
pub mod contrast;
pub mod mailer;
pub mod server;

pub use config::Config;
pub use contact::{ContactMailer, ContactRequest, DispatchError, DispatchOutcome};
pub use contrast::{compute_contrast, ContrastError, ContrastResult, Rgb, TextSize};
pub use mailer::{
    build_mail_transport, select_transport, MailTransport, OutgoingMail, TransportError,
    TransportStrategy,
};
