#![no_std]

pub mod color;
pub mod command;
pub mod console;
pub mod engine;
pub mod frame;
pub mod line;
pub mod strip;
pub mod timing;
pub mod transport;

pub use command::{Command, CommandError};
pub use console::{Console, ConsoleConfig, ConsoleError, NoIndicator, SessionStatus};
pub use engine::{BitPhase, BitWindow, EngineSlot, EngineState, TimingEngine};
pub use frame::{ChannelOrder, FrameBuffer};
pub use line::{LineEditor, LineEvent};
pub use strip::{ArmError, SessionState, Strip, StripWriter};
pub use timing::{Bit, Half, PulseTable, TICK_NS};
pub use transport::HostLink;

pub use color::Rgb;
pub use embassy_time::Duration;
