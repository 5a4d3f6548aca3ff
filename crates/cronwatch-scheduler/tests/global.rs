// Single-flight initialization of the process-wide default controller.

use std::sync::Arc;
use std::thread;

use cronwatch_scheduler::{Config, Controller, ManualTrigger};

#[test]
fn concurrent_first_use_yields_one_instance() {
    let handles: Vec<_> = (0..16)
        .map(|_| thread::spawn(|| cronwatch_scheduler::default() as *const Controller as usize))
        .collect();
    let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(addrs.windows(2).all(|w| w[0] == w[1]));
    assert!(cronwatch_scheduler::global().is_some());
}

#[test]
fn init_after_default_is_rejected() {
    let installed = cronwatch_scheduler::default();

    let trigger = Arc::new(ManualTrigger::new());
    let rejected = Controller::builder(Config::default())
        .trigger(trigger.clone())
        .build();
    let err = cronwatch_scheduler::init(rejected).unwrap_err();

    assert_eq!(err.code(), "CONFIG_ERROR");
    assert!(trigger.is_stopped());
    assert!(std::ptr::eq(installed, cronwatch_scheduler::default()));
    assert!(installed.is_running());
}
