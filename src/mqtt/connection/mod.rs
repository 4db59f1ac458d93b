// MIT License
//
// Copyright (c) 2025 Takatoshi Kondo
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Connection state management: the Sans-I/O state machine, its event
//! façade, the incremental packet framer, and the compile-time
//! role/version sendability rules that gate what can be sent over it.

mod core;
pub mod event;
pub mod packet_builder;
pub mod packet_id_manager;
pub mod role;
pub mod sendable;
mod sendable_helper;
pub mod sendable_role;
pub mod sendable_version;
pub mod store;
pub mod version;

pub use self::core::{Connection, GenericConnection};
pub use event::{Event, GenericEvent, TimerKind};
pub use packet_builder::{PacketBuildResult, PacketBuilder, PacketData, RawPacket};
pub use packet_id_manager::PacketIdManager;
pub use role::{Any, Client, RoleType, Server};
pub use sendable::{Sendable, SendBehavior, SendableHelper};
pub use sendable_role::SendableRole;
pub use sendable_version::SendableVersion;
pub use store::{GenericStore, Store};
pub use version::Version;
