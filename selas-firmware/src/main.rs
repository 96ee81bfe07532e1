//! Selas demo firmware
//!
//! Drives a 128x64 KS0108 panel over the direct GPIO transport on an
//! RP2040. A render task animates a test pattern into a shared
//! framebuffer; the display task sweeps completed frames out to the
//! panel.
//!
//! Wiring: data bus on GPIO0-7, enable on GPIO8, RS on GPIO9, RW on
//! GPIO10, chip selects on GPIO11/12, reset on GPIO13.

#![no_std]
#![no_main]

mod pins;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Flex, Level, Output};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Delay, Duration, Ticker};
use {defmt_rtt as _, panic_probe as _};

use crate::pins::{RpBusPin, RpOutput};
use selas_core::geometry::Geometry;
use selas_core::traits::Display;
use selas_drivers::display::parallel::ParallelKs0108;

const WIDTH: usize = 128;
const HEIGHT: usize = 64;
const FRAME_BYTES: usize = WIDTH * HEIGHT / 8;

/// Shared framebuffer, page-major
static FRAME: Mutex<CriticalSectionRawMutex, [u8; FRAME_BYTES]> = Mutex::new([0; FRAME_BYTES]);

/// Signal that a fresh frame is ready to sweep out
static FRAME_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

type PanelDriver = ParallelKs0108<RpBusPin<'static>, RpOutput<'static>, Delay, 2>;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Selas firmware starting...");

    let p = embassy_rp::init(Default::default());

    let data = [
        RpBusPin::new(Flex::new(p.PIN_0)),
        RpBusPin::new(Flex::new(p.PIN_1)),
        RpBusPin::new(Flex::new(p.PIN_2)),
        RpBusPin::new(Flex::new(p.PIN_3)),
        RpBusPin::new(Flex::new(p.PIN_4)),
        RpBusPin::new(Flex::new(p.PIN_5)),
        RpBusPin::new(Flex::new(p.PIN_6)),
        RpBusPin::new(Flex::new(p.PIN_7)),
    ];
    let e = RpOutput(Output::new(p.PIN_8, Level::Low));
    let rs = RpOutput(Output::new(p.PIN_9, Level::Low));
    let rw = RpOutput(Output::new(p.PIN_10, Level::Low));
    let cs = [
        RpOutput(Output::new(p.PIN_11, Level::Low)),
        RpOutput(Output::new(p.PIN_12, Level::Low)),
    ];
    let reset = RpOutput(Output::new(p.PIN_13, Level::High));

    let geometry = Geometry::new(WIDTH, HEIGHT).unwrap();
    let display = ParallelKs0108::new(geometry, data, e, rs, rw, cs, Some(reset), Delay).unwrap();

    info!("Panel pins configured");

    spawner.spawn(render_task()).unwrap();
    spawner.spawn(display_task(display)).unwrap();

    info!("All tasks spawned");
}

/// Render task - animates a test pattern into the shared framebuffer
#[embassy_executor::task]
async fn render_task() {
    info!("Render task started");

    let mut ticker = Ticker::every(Duration::from_millis(100));
    let mut bar = 0;

    loop {
        {
            let mut frame = FRAME.lock().await;
            draw_test_pattern(&mut frame, bar);
        }
        FRAME_READY.signal(());

        bar = (bar + 1) % WIDTH;
        ticker.next().await;
    }
}

/// Display task - owns the panel driver and sweeps frames out
#[embassy_executor::task]
async fn display_task(mut display: PanelDriver) {
    info!("Display task started");

    if display.init().is_err() {
        error!("Panel init failed");
        return;
    }

    loop {
        FRAME_READY.wait().await;

        let frame = *FRAME.lock().await;
        if display.print_buffer(&frame).is_err() {
            warn!("Frame write failed");
        }
    }
}

/// Checkerboard with a moving solid bar
fn draw_test_pattern(frame: &mut [u8; FRAME_BYTES], bar: usize) {
    for page in 0..HEIGHT / 8 {
        for column in 0..WIDTH {
            frame[page * WIDTH + column] = if column == bar {
                0xFF
            } else if (column / 8 + page) % 2 == 0 {
                0x0F
            } else {
                0xF0
            };
        }
    }
}
