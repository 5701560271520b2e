//! Scripted terminal tour: a search box (debounce), a scrolling list
//! (throttle), a status poll (interval) and a progress bar (tween), all driven
//! by one `EventLoop` while a feeder thread plays the part of the user.
//!
//! `RUST_LOG=lull_core=debug cargo run -p showcase` shows the scheduler logs.

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use lull_core::prelude::*;
use lull_platform::{EventLoop, LoopProxy};

#[derive(Debug)]
enum Input {
    Key(char),
    Erase,
    Scroll(u32),
    Done,
}

fn feeder(proxy: LoopProxy<Input>) -> anyhow::Result<()> {
    let send = |event| proxy.send(event).map_err(|_| anyhow::anyhow!("loop closed"));
    let pause = |ms| thread::sleep(Duration::from_millis(ms));

    // slow typing: every pause outlasts the debounce
    for c in "lu".chars() {
        send(Input::Key(c))?;
        pause(400);
    }
    send(Input::Erase)?;
    // fast typing: one settled query
    for c in "ull timers".chars() {
        send(Input::Key(c))?;
        pause(40);
    }
    pause(150);
    for y in (0..=600).step_by(15) {
        send(Input::Scroll(y))?;
        pause(8);
    }
    pause(200);
    send(Input::Done)?;
    Ok(())
}

fn bar(fraction: f32) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * 20.0).round() as usize;
    format!("[{}{}]", "#".repeat(filled), " ".repeat(20 - filled))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let el = EventLoop::<Input>::new();
    let host = el.host();
    let scope = Scope::new();
    let progress: Rc<RefCell<Option<Tween>>> = Rc::new(RefCell::new(None));

    let (search, on_scroll, status) = scope.run(|| -> anyhow::Result<_> {
        let search = Debounced::new(host.clone(), String::new(), DebounceSpec::search());
        search.on_change({
            let host = host.clone();
            let progress = progress.clone();
            move |q: &String| {
                println!("search   -> {q:?}");
                let mut slot = progress.borrow_mut();
                match slot.as_ref() {
                    Some(tween) => {
                        tween.value().set(0.0);
                        if let Err(e) = tween.retarget(1.0) {
                            log::error!("progress: {e}");
                        }
                    }
                    None => match Tween::start(host.clone(), TweenSpec::slow(), 0.0, 1.0) {
                        Ok(tween) => {
                            let last = RefCell::new(usize::MAX);
                            tween.value().subscribe(move |v: &f32| {
                                let step = (v * 4.0).floor() as usize;
                                if step != *last.borrow() {
                                    *last.borrow_mut() = step;
                                    println!("loading  {} {:>3.0}%", bar(*v), v * 100.0);
                                }
                            });
                            *slot = Some(tween);
                        }
                        Err(e) => log::error!("progress: {e}"),
                    },
                }
            }
        });

        let on_scroll = Throttled::new(host.clone(), ThrottleSpec::scroll(), |y: u32| {
            println!("scroll   -> y={y}");
        });

        let status = Interval::new(host.clone(), IntervalSpec::from_millis(500)?, |n| {
            println!("status   #{n}");
        })?;

        Ok((search, on_scroll, status))
    })?;

    let proxy = el.proxy();
    let script = thread::spawn(move || feeder(proxy));

    let mut typed = String::new();
    el.run(|event, _| match event {
        Input::Key(c) => {
            typed.push(c);
            search.observe(typed.clone());
        }
        Input::Erase => {
            typed.pop();
            search.observe(typed.clone());
        }
        Input::Scroll(y) => on_scroll.request(y),
        Input::Done => {
            status.teardown();
            el.proxy().exit_when_idle();
        }
    })?;

    script
        .join()
        .map_err(|_| anyhow::anyhow!("feeder thread panicked"))??;

    println!(
        "done: {} scroll handler runs, {} status ticks, final query {:?}",
        on_scroll.executions(),
        status.ticks(),
        search.current()
    );
    scope.dispose();
    log::info!("timers: {:?}", el.timers().stats());
    Ok(())
}
