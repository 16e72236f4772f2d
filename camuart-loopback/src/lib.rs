//! # Loopback Backend for the Camera Serial Bridge
//!
//! In-memory emulation of the camera's serial register block, with the TX
//! line looped back onto the RX line.
//!
//! ## Overview
//!
//! This crate provides [`LoopbackDevice`], an implementation of the
//! [`CameraDevice`](camuart_device::CameraDevice) capability surface that
//! behaves like the real firmware: enumerated line routing with per-line
//! output capability, symbolic frame-format registers, a bounded transfer
//! buffer shared by both directions, a depth-limited RX FIFO with an
//! overflow latch, and break/status bits. Transmitted bytes reappear on the
//! receive side, so a bridge driven against it exercises the full
//! transfer protocol without hardware.
//!
//! The `camuart-demo` binary runs an end-to-end loopback session from the
//! command line.

pub mod device;

pub use device::LoopbackDevice;
