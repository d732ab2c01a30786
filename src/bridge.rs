// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The device-level interop protocol.

* [Session] owns the bridge between the two device contexts.
* The session's registry maps native primary resources to secondary names; each live
  registration is represented by a [Binding].
* [LockBracket] brackets secondary-API work on registered resources.

Everything here lives on the host thread that drives the frame loop.  The types are
deliberately `!Send`: the secondary API's context is current on exactly one thread.
*/

mod lock;
mod registry;
mod session;

pub use lock::{BracketStats, LockBracket};
pub use registry::{BindingId, BindingInfo};
pub use session::{Binding, Session};
