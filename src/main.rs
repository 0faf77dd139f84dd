#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

#[cfg(not(target_arch = "avr"))]
fn main() {}

#[cfg(target_arch = "avr")]
mod firmware {
    use imos_firmware::config::ADC_CHANNELS;
    use imos_firmware::drivers::{SerialConsole, Tachometer};
    use imos_firmware::hal::avr::{self, AvrAdc, AvrEeprom, AvrExtInt, AvrTimer0, AvrUsart};
    use imos_firmware::hal::{Hal, Line};
    use imos_firmware::rtos::{Callback, Scheduler};
    use panic_halt as _;
    use ufmt::uwriteln;

    type Board = Hal<'static, AvrAdc, AvrEeprom, AvrUsart, AvrExtInt, AvrTimer0>;

    // Shared between the interrupt vectors below and the foreground loop.
    static HAL: Board = Hal::new(
        AvrAdc::new(),
        AvrEeprom::new(),
        AvrUsart::new(),
        AvrExtInt::new(),
        AvrTimer0::new(),
    );
    static TACHOMETER: Tachometer = Tachometer::new();

    const SIGNATURE_ADDR: u16 = 0;
    static SIGNATURE: [u8; 4] = *b"IMOS";

    const REPORT_INTERVAL_MS: u16 = 1000;

    #[avr_device::entry]
    fn main() -> ! {
        HAL.start();

        let mut scheduler = Scheduler::new(&HAL.clock);
        let mut console = SerialConsole::new(&HAL.serial);

        // Global interrupts on: the scan, tick and serial start running.
        unsafe { avr_device::interrupt::enable() };

        console.write_line("IMOS v0.1.0");
        if let Err(e) = TACHOMETER.attach(&mut scheduler, &HAL.signals) {
            uwriteln!(console, "tachometer: {}", e).ok();
        }
        if let Err(e) = scheduler.register(REPORT_INTERVAL_MS, Callback::Routine(report)) {
            uwriteln!(console, "report: {}", e).ok();
        }
        check_signature(&mut console);

        loop {
            scheduler.refresh();

            match console.read_byte() {
                Some(b'r') => report(),
                Some(byte) => console.write_byte(byte),
                // idle mode keeps the ADC scan and the tick running
                None => avr::sleep_idle(),
            }
        }
    }

    fn check_signature(console: &mut SerialConsole<'static, AvrUsart>) {
        let mut stored = [0u8; 4];
        match HAL.eeprom.read(SIGNATURE_ADDR, &mut stored) {
            Ok(_) if stored == SIGNATURE => console.write_line("config ok"),
            Ok(_) => match HAL.eeprom.write(SIGNATURE_ADDR, &SIGNATURE) {
                Ok(_) => console.write_line("config initialised"),
                Err(e) => {
                    uwriteln!(console, "eeprom: {}", e).ok();
                }
            },
            Err(e) => {
                uwriteln!(console, "eeprom: {}", e).ok();
            }
        }
    }

    fn report() {
        let mut console = SerialConsole::new(&HAL.serial);
        uwriteln!(console, "t={}s rpm={}", HAL.now_s(), TACHOMETER.rpm()).ok();
        for channel in 0..ADC_CHANNELS {
            if let Ok(value) = HAL.sampler.read(channel) {
                uwriteln!(console, "adc{}={}", channel, value).ok();
            }
        }
    }

    #[avr_device::interrupt(atmega328p)]
    fn TIMER0_COMPA() {
        HAL.clock.tick();
    }

    #[avr_device::interrupt(atmega328p)]
    fn ADC() {
        HAL.sampler.on_conversion_complete();
    }

    #[avr_device::interrupt(atmega328p)]
    fn EE_READY() {
        HAL.eeprom.on_ready();
    }

    #[avr_device::interrupt(atmega328p)]
    fn USART_RX() {
        HAL.serial.on_receive();
    }

    #[avr_device::interrupt(atmega328p)]
    fn USART_TX() {
        HAL.serial.on_transmit_complete();
    }

    #[avr_device::interrupt(atmega328p)]
    fn INT0() {
        HAL.signals.on_interrupt(Line::Int0);
    }

    #[avr_device::interrupt(atmega328p)]
    fn INT1() {
        HAL.signals.on_interrupt(Line::Int1);
    }
}
