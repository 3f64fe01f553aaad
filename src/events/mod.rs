//! # Events Module
//!
//! Progress reporting for pipeline runs.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Pipeline(PipelineEvent::StageFinished { name, emitted, .. }) = event {
//!             println!("{name} emitted {emitted} items");
//!         }
//!     }
//! });
//!
//! signer.sign_with_events(items, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
