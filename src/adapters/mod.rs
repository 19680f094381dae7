//! Collaborators behind the domain ports: XML files on disk, SMTP, clocks.

pub mod clock;
pub mod file;
pub mod mail;
pub mod xml;

pub use clock::{FixedClock, SystemClock};
pub use file::{read_subscriptions, FileDataSource, FileRepository};
pub use mail::{RecordingTransport, SmtpTransport};
