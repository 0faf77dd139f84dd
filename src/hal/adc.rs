//! Free-running, interrupt-fed averaging ADC sampler
//!
//! The converter scans the channels round-robin with no idle time: every
//! conversion-complete interrupt stores the reading, moves to the next
//! channel and starts the next conversion. Each channel keeps the last
//! [`ADC_SAMPLE_DEPTH`] readings and [`Sampler::read`] averages them.

use crate::config::{ADC_CHANNELS, ADC_SAMPLE_DEPTH};
use core::cell::RefCell;
use critical_section::Mutex;

/// Register-level operations of an analog converter.
pub trait AdcPort {
    /// Reference, prescaler and interrupt setup. Leaves the converter off.
    fn configure(&mut self);
    /// Route `channel` to the converter input.
    fn select(&mut self, channel: u8);
    fn start_conversion(&mut self);
    /// Result of the conversion that just completed.
    fn result(&mut self) -> u16;
    fn set_enabled(&mut self, enabled: bool);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplerError {
    NoSuchChannel,
}

impl ufmt::uDisplay for SamplerError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.write_str("no such ADC channel")
    }
}

struct SamplerState<P, const CHANNELS: usize> {
    port: P,
    samples: [[u16; ADC_SAMPLE_DEPTH]; CHANNELS],
    index: [u8; CHANNELS],
    channel: u8,
    enabled: bool,
}

/// Averaging sampler over `CHANNELS` analog inputs.
///
/// The channel selector and the per-channel write index are only touched
/// by [`Sampler::start`] (before the first conversion) and by
/// [`Sampler::on_conversion_complete`], so there is exactly one conversion
/// in flight at any time.
pub struct Sampler<P, const CHANNELS: usize = ADC_CHANNELS> {
    state: Mutex<RefCell<SamplerState<P, CHANNELS>>>,
}

impl<P: AdcPort, const CHANNELS: usize> Sampler<P, CHANNELS> {
    pub const fn new(port: P) -> Self {
        Self {
            state: Mutex::new(RefCell::new(SamplerState {
                port,
                samples: [[0; ADC_SAMPLE_DEPTH]; CHANNELS],
                index: [0; CHANNELS],
                channel: 0,
                enabled: false,
            })),
        }
    }

    /// Configure the converter and switch it on. Conversions begin with
    /// [`Sampler::start`].
    pub fn configure(&self) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.port.configure();
            state.port.set_enabled(true);
            state.enabled = true;
        });
    }

    /// Reset the scan to channel 0 and kick off the first conversion.
    pub fn start(&self) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.channel = 0;
            state.port.select(0);
            state.port.start_conversion();
        });
        debug!("ADC scan started on {=usize} channels", CHANNELS);
    }

    /// Average of the last readings of `channel`.
    ///
    /// Until the channel's buffer has been filled once the value includes the
    /// zeroed start-up slots and is not meaningful.
    pub fn read(&self, channel: usize) -> Result<u16, SamplerError> {
        if channel >= CHANNELS {
            return Err(SamplerError::NoSuchChannel);
        }
        let samples = critical_section::with(|cs| self.state.borrow_ref(cs).samples[channel]);
        let sum: u32 = samples.iter().map(|&s| u32::from(s)).sum();
        Ok((sum / ADC_SAMPLE_DEPTH as u32) as u16)
    }

    /// Suspend or resume conversions. Buffers are kept; after resuming the
    /// averages are stale until fresh readings replace them.
    pub fn set_power(&self, on: bool) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.enabled == on {
                return;
            }
            state.enabled = on;
            state.port.set_enabled(on);
            if on {
                // switching off aborts the conversion in flight
                let channel = state.channel;
                state.port.select(channel);
                state.port.start_conversion();
            }
        });
    }

    pub fn is_powered(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).enabled)
    }

    /// Conversion-complete interrupt body.
    pub fn on_conversion_complete(&self) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if !state.enabled {
                return;
            }
            let reading = state.port.result();
            let channel = usize::from(state.channel);
            let slot = usize::from(state.index[channel]);
            state.samples[channel][slot] = reading;
            state.index[channel] = ((slot + 1) % ADC_SAMPLE_DEPTH) as u8;

            let next = ((channel + 1) % CHANNELS) as u8;
            state.channel = next;
            state.port.select(next);
            state.port.start_conversion();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell as StdRefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Default)]
    struct Recorded {
        selected: u8,
        started: Vec<u8>,
        stored: Vec<(u8, u16)>,
        enabled: bool,
        configured: bool,
        counter: u16,
    }

    #[derive(Clone, Default)]
    struct FakeAdc(Rc<StdRefCell<Recorded>>);

    impl AdcPort for FakeAdc {
        fn configure(&mut self) {
            self.0.borrow_mut().configured = true;
        }

        fn select(&mut self, channel: u8) {
            self.0.borrow_mut().selected = channel;
        }

        fn start_conversion(&mut self) {
            let mut r = self.0.borrow_mut();
            let channel = r.selected;
            r.started.push(channel);
        }

        fn result(&mut self) -> u16 {
            let mut r = self.0.borrow_mut();
            r.counter += 1;
            let value = u16::from(r.selected) * 100 + r.counter % 37;
            let channel = r.selected;
            r.stored.push((channel, value));
            value
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.0.borrow_mut().enabled = enabled;
        }
    }

    fn running_sampler<const N: usize>() -> (Sampler<FakeAdc, N>, FakeAdc) {
        let port = FakeAdc::default();
        let sampler = Sampler::new(port.clone());
        sampler.configure();
        sampler.start();
        (sampler, port)
    }

    #[test]
    fn start_begins_on_channel_zero() {
        let (_sampler, port) = running_sampler::<6>();
        let r = port.0.borrow();
        assert!(r.configured);
        assert!(r.enabled);
        assert_eq!(r.started, [0]);
    }

    #[test]
    fn rotation_is_round_robin() {
        let (sampler, port) = running_sampler::<6>();
        for _ in 0..40 {
            sampler.on_conversion_complete();
        }
        let started = port.0.borrow().started.clone();
        for window in started.windows(6) {
            let mut seen = [false; 6];
            for &ch in window {
                assert!(!seen[usize::from(ch)]);
                seen[usize::from(ch)] = true;
            }
        }
    }

    #[test]
    fn read_averages_last_eight_samples() {
        let (sampler, port) = running_sampler::<6>();
        // a bit more than three full refreshes of every buffer
        for _ in 0..(6 * ADC_SAMPLE_DEPTH * 3 + 4) {
            sampler.on_conversion_complete();
        }

        let stored = port.0.borrow().stored.clone();
        for channel in 0..6u8 {
            let values: Vec<u32> = stored
                .iter()
                .filter(|(ch, _)| *ch == channel)
                .map(|&(_, v)| u32::from(v))
                .collect();
            let last = &values[values.len() - ADC_SAMPLE_DEPTH..];
            let expected = (last.iter().sum::<u32>() / ADC_SAMPLE_DEPTH as u32) as u16;
            assert_eq!(sampler.read(usize::from(channel)), Ok(expected));
        }
    }

    #[test]
    fn read_rejects_unknown_channel() {
        let (sampler, _port) = running_sampler::<3>();
        assert_eq!(sampler.read(3), Err(SamplerError::NoSuchChannel));
    }

    #[test]
    fn power_off_keeps_buffers_and_stops_scan() {
        let (sampler, port) = running_sampler::<2>();
        for _ in 0..(2 * ADC_SAMPLE_DEPTH) {
            sampler.on_conversion_complete();
        }
        let before = sampler.read(1).unwrap();

        sampler.set_power(false);
        assert!(!sampler.is_powered());
        assert!(!port.0.borrow().enabled);
        let started = port.0.borrow().started.len();
        sampler.on_conversion_complete();
        assert_eq!(port.0.borrow().started.len(), started);
        assert_eq!(sampler.read(1), Ok(before));

        sampler.set_power(true);
        let r = port.0.borrow();
        assert!(r.enabled);
        assert_eq!(r.started.len(), started + 1);
    }
}
