//! blepush Runtime
//!
//! Executes a [`blepush_core::Session`] against any [`blepush_core::Transport`].
//! The session decides, the runner acts: each action is carried out on the
//! transport, the image source or the timer service, and its result is fed
//! back as the next event.
//!
//! ```rust,no_run
//! # use blepush_core::{MemoryImageSource, SessionConfig, TargetAddress, Transport};
//! # use blepush_runtime::{cancel_pair, SessionRunner};
//! # async fn example<T: Transport>(transport: T) -> Result<(), Box<dyn std::error::Error>> {
//! let target = TargetAddress::parse("AA:BB:CC:DD:EE:FF")?;
//! let image = MemoryImageSource::new(vec![0u8; 4736], 4736);
//! let (handle, signal) = cancel_pair();
//!
//! let runner = SessionRunner::new(target, SessionConfig::default(), transport, image, signal)?;
//! let report = runner.run().await;
//! # drop(handle);
//! println!("{} chunks written", report.chunks_written);
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod runner;
pub mod timers;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use runner::{SessionReport, SessionRunner};
pub use timers::TimerService;
