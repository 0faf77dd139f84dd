//! Interrupt-driven peripheral drivers and cooperative event scheduler for
//! the IMOS vehicle controller (ATmega328P).
//!
//! Interrupt handlers and the foreground loop share driver state through
//! `critical_section::Mutex`; each piece of state has one writing context.
//! The drivers are generic over small port traits, so everything except the
//! register glue in `hal::avr` runs on the host as well.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod drivers;
pub mod hal;
pub mod rtos;
