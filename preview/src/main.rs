//! Desktop simulator for the ws2812-gadget console
//!
//! Commands typed into the terminal panel go through the real `Console`,
//! the armed frame is clocked out by a `TimingEngine` onto a recording pin,
//! and the captured waveform is plotted and decoded back into LED colors.

use std::collections::VecDeque;
use std::convert::Infallible;

use eframe::egui::{self};
use ws2812_gadget::console::send_line_capacity;
use ws2812_gadget::timing::cycles_per_tick;
use ws2812_gadget::{
    Console, ConsoleConfig, Duration, EngineState, HostLink, PulseTable, SessionStatus, Strip,
    TICK_NS, TimingEngine,
};

/// Maximum number of LEDs the simulated strip holds
const MAX_LEDS: usize = 60;

/// Console line buffer, long enough for a `send` to every LED
const LINE_CAPACITY: usize = send_line_capacity(MAX_LEDS);

/// Core clock of the reference board
const CPU_HZ: u32 = 16_000_000;

/// Upper bound on ticks clocked per UI frame
const MAX_TICKS_PER_FRAME: usize = MAX_LEDS * 24 * 10 + 100;

/// Size of each LED rectangle in pixels
const LED_SIZE: f32 = 24.0;

/// Gap between LEDs
const LED_GAP: f32 = 4.0;

/// Height of the waveform plot
const SCOPE_HEIGHT: f32 = 80.0;

static STRIP: Strip<MAX_LEDS> = Strip::new();

const PREVIEW_CONSOLE_CONFIG: ConsoleConfig = ConsoleConfig {
    busy_timeout: Duration::from_millis(0),
    startup_delay: Duration::from_millis(0),
    ..ConsoleConfig::DEFAULT
};

fn main() -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 600.0])
            .with_title("WS2812 Gadget Preview"),
        ..Default::default()
    };

    eframe::run_native(
        "ws2812-gadget-preview",
        options,
        Box::new(|_cc| Ok(Box::new(PreviewApp::new()))),
    )
}

/// Terminal side of the console, backed by in-memory queues
#[derive(Default)]
struct PanelHost {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl embedded_io::ErrorType for PanelHost {
    type Error = Infallible;
}

impl embedded_io::Read for PanelHost {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < buf.len() {
            let Some(byte) = self.input.pop_front() else {
                break;
            };
            buf[count] = byte;
            count += 1;
        }
        Ok(count)
    }
}

impl embedded_io::ReadReady for PanelHost {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.input.is_empty())
    }
}

impl embedded_io::Write for PanelHost {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl HostLink for PanelHost {
    fn is_connected(&mut self) -> bool {
        true
    }
}

/// Pin that keeps its current level, sampled once per tick
#[derive(Default)]
struct ScopePin {
    level: bool,
}

impl embedded_hal::digital::ErrorType for ScopePin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for ScopePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level = true;
        Ok(())
    }
}

struct PreviewApp {
    console: Console<'static, PanelHost, MAX_LEDS, LINE_CAPACITY>,
    engine: TimingEngine<'static, ScopePin, MAX_LEDS>,
    /// Text currently in the input box
    input: String,
    /// Everything the console printed
    terminal: String,
    /// Pin level per tick of the last transmitted frame
    trace: Vec<bool>,
    /// Colors decoded from the last waveform
    leds: Vec<[u8; 3]>,
    /// Horizontal zoom of the waveform plot
    pixels_per_tick: f32,
}

impl PreviewApp {
    fn new() -> Self {
        let mut app = Self {
            console: Console::new(PanelHost::default(), &STRIP, PREVIEW_CONSOLE_CONFIG),
            engine: TimingEngine::new(&STRIP, ScopePin::default()),
            input: String::new(),
            terminal: String::new(),
            trace: Vec::new(),
            leds: Vec::new(),
            pixels_per_tick: 2.0,
        };
        // The panel host never disconnects, so the banner comes from `help`
        // rather than a full session.
        app.input.push_str("help");
        app.submit();
        app
    }

    /// Feed a typed line to the console, byte by byte
    fn submit(&mut self) {
        let line = std::mem::take(&mut self.input);
        let host = self.console.host_mut();
        host.input.extend(line.bytes());
        host.input.push_back(b'\r');

        while !self.console.host().input.is_empty() {
            if self.console.poll() != Ok(SessionStatus::Active) {
                break;
            }
        }
        self.collect_output();
    }

    /// Clock the engine until the armed frame has latched
    fn clock_engine(&mut self) {
        if STRIP.is_idle() {
            return;
        }

        let mut trace = Vec::new();
        for _ in 0..MAX_TICKS_PER_FRAME {
            self.engine.tick();
            trace.push(self.engine.pin().level);
            if self.engine.state() == EngineState::Idle {
                break;
            }
        }
        self.leds = decode_leds(&trace, self.engine.table());
        self.trace = trace;

        let _ = self.console.poll();
        self.collect_output();
    }

    fn collect_output(&mut self) {
        let output = std::mem::take(&mut self.console.host_mut().output);
        self.terminal
            .push_str(&String::from_utf8_lossy(&output).replace('\r', ""));
    }
}

/// Rebuild the transmitted colors from per-tick pin levels
fn decode_leds(trace: &[bool], table: &PulseTable) -> Vec<[u8; 3]> {
    let window = usize::from(table.window(ws2812_gadget::Bit::Zero));
    let data_len = trace.len().saturating_sub(usize::from(table.reset));
    let bits: Vec<bool> = trace[..data_len]
        .chunks_exact(window)
        .map(|chunk| {
            let high = chunk.iter().take_while(|level| **level).count();
            high == usize::from(table.one_high)
        })
        .collect();

    bits.chunks_exact(24)
        .map(|led| {
            let mut bytes = [0u8; 3];
            for (offset, bit) in led.iter().enumerate() {
                if *bit {
                    bytes[offset / 8] |= 1 << (offset % 8);
                }
            }
            bytes
        })
        .collect()
}

impl eframe::App for PreviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.clock_engine();

        egui::TopBottomPanel::bottom("input").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(">");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.input)
                        .desired_width(f32::INFINITY)
                        .hint_text("send 3 FF0000 00FF00 0000FF"),
                );
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    self.submit();
                    response.request_focus();
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            // === LEDs ===
            ui.horizontal(|ui| {
                ui.label(format!(
                    "Session: {:?}  Latched: {}",
                    STRIP.session(),
                    STRIP.frames_latched()
                ));
            });
            ui.add_space(4.0);

            let available_width = ui.available_width();
            let led_pitch = LED_SIZE + LED_GAP;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let leds_per_row = (available_width / led_pitch).floor().max(1.0) as usize;
            let rows = self.leds.len().div_ceil(leds_per_row).max(1);
            #[allow(clippy::cast_precision_loss)]
            let height = rows as f32 * led_pitch;

            let (response, painter) = ui.allocate_painter(
                egui::vec2(available_width, height),
                egui::Sense::hover(),
            );
            let origin = response.rect.min;

            #[allow(clippy::cast_precision_loss)]
            for (i, [r, g, b]) in self.leds.iter().enumerate() {
                let row = i / leds_per_row;
                let col = i % leds_per_row;
                let x = origin.x + col as f32 * led_pitch;
                let y = origin.y + row as f32 * led_pitch;

                let rect = egui::Rect::from_min_size(
                    egui::pos2(x, y),
                    egui::vec2(LED_SIZE, LED_SIZE),
                );
                painter.rect_filled(rect, 3.0, egui::Color32::from_rgb(*r, *g, *b));
            }

            ui.add_space(16.0);

            // === Waveform ===
            ui.horizontal(|ui| {
                ui.label("Zoom:");
                ui.add(egui::Slider::new(&mut self.pixels_per_tick, 0.25..=8.0).logarithmic(true));
                #[allow(clippy::cast_precision_loss)]
                let micros = self.trace.len() as f32 * TICK_NS as f32 / 1000.0;
                ui.label(format!("{} ticks, {micros:.1} us", self.trace.len()));
                ui.label(format!(
                    "timer period: {} cycles at {} MHz",
                    cycles_per_tick(CPU_HZ, TICK_NS),
                    CPU_HZ / 1_000_000
                ));
            });

            egui::ScrollArea::horizontal()
                .id_salt("scope")
                .show(ui, |ui| {
                    #[allow(clippy::cast_precision_loss)]
                    let width = (self.trace.len() as f32 * self.pixels_per_tick).max(1.0);
                    let (response, painter) = ui.allocate_painter(
                        egui::vec2(width, SCOPE_HEIGHT),
                        egui::Sense::hover(),
                    );
                    let rect = response.rect;
                    let stroke = egui::Stroke::new(1.0, egui::Color32::LIGHT_GREEN);
                    let level_y = |level: bool| {
                        if level {
                            rect.top() + 8.0
                        } else {
                            rect.bottom() - 8.0
                        }
                    };

                    let mut previous = false;
                    #[allow(clippy::cast_precision_loss)]
                    for (tick, level) in self.trace.iter().enumerate() {
                        let x0 = rect.left() + tick as f32 * self.pixels_per_tick;
                        let x1 = x0 + self.pixels_per_tick;
                        if *level != previous {
                            painter.line_segment(
                                [egui::pos2(x0, level_y(previous)), egui::pos2(x0, level_y(*level))],
                                stroke,
                            );
                        }
                        painter.line_segment(
                            [egui::pos2(x0, level_y(*level)), egui::pos2(x1, level_y(*level))],
                            stroke,
                        );
                        previous = *level;
                    }
                });

            ui.add_space(16.0);

            // === Terminal ===
            egui::ScrollArea::vertical()
                .id_salt("terminal")
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    ui.add(
                        egui::Label::new(egui::RichText::new(&self.terminal).monospace()),
                    );
                });
        });
    }
}
