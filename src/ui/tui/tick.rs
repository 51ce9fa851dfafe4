use crate::session::output::Handle;
use crate::ui::tui::Event;
use crossterm::event;
use crossterm::event::KeyEvent;
use log::error;
use std::sync::atomic::Ordering;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

/// Reads terminal input and produces a tick every `rate`.
pub struct Ticker {
    rate: Duration,
}

impl Ticker {
    pub fn new(rate: Duration) -> Self {
        Self { rate }
    }

    pub fn run(self, tx: Sender<Event<KeyEvent>>) -> Handle {
        let handle = Handle::default();
        let flag = handle.flag.clone();

        thread::spawn(move || {
            let mut last_tick = Instant::now();
            loop {
                let timeout = self
                    .rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or_else(|| Duration::from_secs(0));

                if flag.load(Ordering::SeqCst) {
                    return;
                }

                match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(event::Event::Key(key)) => {
                            if tx.send(Event::Input(key)).is_err() {
                                return;
                            }
                        }
                        Ok(event::Event::Resize(_, _)) => {
                            if tx.send(Event::Resize).is_err() {
                                return;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(target: "tui", "read terminal event: {e}");
                            return;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        error!(target: "tui", "poll terminal events: {e}");
                        return;
                    }
                }

                if last_tick.elapsed() >= self.rate {
                    if tx.send(Event::Tick).is_err() {
                        return;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        handle
    }
}
