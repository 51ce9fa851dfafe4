use crate::common::{
    connected_session, frame, location, stopped_at, wait_for, FakeClient, Script, SourceFile,
    MAIN_GO,
};
use dlvtui::client::DebuggerState;
use dlvtui::session::dispatch::Dispatcher;
use dlvtui::session::panel::PanelKind;
use std::collections::BTreeSet;

fn stopped_in(src: &SourceFile) -> Script {
    let loc = location(&src.path_str(), 6, "main.main");
    Script {
        state: stopped_at(1, 1, &loc),
        frames: vec![
            frame(&src.path_str(), 6, "main.main"),
            frame(&src.path_str(), 3, "main.caller"),
        ],
        ..Default::default()
    }
}

fn run(dispatcher: &Dispatcher, cmd: &str) {
    dispatcher
        .submit(cmd)
        .expect("command accepted")
        .join()
        .unwrap();
}

#[test]
fn test_repeat_last_command() {
    let src = SourceFile::new("repeat.go", MAIN_GO);
    let client = FakeClient::new(stopped_in(&src));
    let (session, _) = connected_session(client.clone());
    let dispatcher = Dispatcher::new(session.clone());

    run(&dispatcher, "continue");
    run(&dispatcher, "next");
    run(&dispatcher, "");
    run(&dispatcher, "   ");

    assert_eq!(client.called("Continue"), 1);
    assert_eq!(client.called("Next"), 3);
    let st = session.lock();
    assert_eq!(st.history.entries(), ["continue", "next"]);
    // no position is known before the first command
    assert!(st.output.text().starts_with("dlv> continue\n"));
    assert_eq!(st.output.text().matches("goroutine 1 frame 0> next\n").count(), 3);
}

#[test]
fn test_submit_while_running() {
    let src = SourceFile::new("busy.go", MAIN_GO);
    let client = FakeClient::new(Script {
        block_continue: true,
        ..stopped_in(&src)
    });
    let (session, _) = connected_session(client.clone());
    let dispatcher = Dispatcher::new(session.clone());

    let cont = dispatcher.submit("continue").unwrap();
    wait_for("continue call", || client.called("Continue") == 1);

    assert_eq!(dispatcher.prompt(), "running");
    assert!(session.lock().command_line.read_only);
    assert!(dispatcher.submit("next").is_none());
    session.lock().command_line.set("step");
    assert!(dispatcher.submit_command_line().is_none());
    assert_eq!(session.lock().command_line.text(), "step");

    dispatcher.interrupt().unwrap().join().unwrap();
    cont.join().unwrap();

    assert_eq!(client.called("Next"), 0);
    assert!(!session.lock().command_line.read_only);
    assert_eq!(dispatcher.prompt(), "goroutine 1 frame 0>");
}

#[test]
fn test_interrupt() {
    struct TestCase {
        halt_fails: bool,
        notice: &'static str,
    }
    let cases = [
        TestCase {
            halt_fails: false,
            notice: "",
        },
        TestCase {
            halt_fails: true,
            notice: "Request manual stop failed: Halt failed\n",
        },
    ];

    for tc in cases {
        let src = SourceFile::new("interrupt.go", MAIN_GO);
        let mut script = stopped_in(&src);
        script.block_continue = true;
        if tc.halt_fails {
            script.failing.insert("Halt");
        }
        let client = FakeClient::new(script);
        let (session, _) = connected_session(client.clone());
        let dispatcher = Dispatcher::new(session.clone());

        let cont = dispatcher.submit("c").unwrap();
        wait_for("continue call", || client.called("Continue") == 1);
        dispatcher.interrupt().unwrap().join().unwrap();
        cont.join().unwrap();

        assert_eq!(client.called("Halt"), 1);
        assert_eq!(client.called("CancelNext"), 1);
        let calls = client.calls();
        let halt = calls.iter().position(|c| c == "Halt").unwrap();
        let cancel = calls.iter().position(|c| c == "CancelNext").unwrap();
        assert!(halt < cancel);
        assert!(session.lock().output.text().contains(tc.notice));
    }
}

#[test]
fn test_switch_prompts() {
    let src = SourceFile::new("switch.go", MAIN_GO);

    let loc = location(&src.path_str(), 6, "main.main");
    let client = FakeClient::new(Script {
        state: stopped_at(1, -1, &loc),
        ..Default::default()
    });
    let (session, cleared) = connected_session(client);
    let dispatcher = Dispatcher::new(session.clone());
    run(&dispatcher, "thread 3");
    assert_eq!(dispatcher.prompt(), "thread 3 frame 0>");
    assert_eq!(
        cleared.take(),
        BTreeSet::from([
            PanelKind::Locals,
            PanelKind::Registers,
            PanelKind::Stack,
            PanelKind::Expressions,
        ])
    );

    let mut script = stopped_in(&src);
    script.frames = ["runtime.gopark", "runtime.chanrecv", "main.worker"]
        .iter()
        .map(|name| frame(&src.path_str(), 6, name))
        .collect();
    let client = FakeClient::new(script);
    let (session, _) = connected_session(client.clone());
    let dispatcher = Dispatcher::new(session.clone());
    run(&dispatcher, "gr 7");
    assert_eq!(dispatcher.prompt(), "goroutine 7 frame 2>");
    assert_eq!(client.called("GetState"), 0);
}

#[test]
fn test_frame_navigation() {
    let src = SourceFile::new("frames.go", MAIN_GO);
    let client = FakeClient::new(stopped_in(&src));
    let (session, cleared) = connected_session(client);
    let dispatcher = Dispatcher::new(session.clone());

    struct TestCase {
        cmd: &'static str,
        prompt: &'static str,
        line: usize,
    }
    let cases = [
        TestCase {
            cmd: "frame 1",
            prompt: "goroutine 1 frame 1>",
            line: 3,
        },
        TestCase {
            cmd: "down",
            prompt: "goroutine 1 frame 0>",
            line: 6,
        },
        TestCase {
            cmd: "down",
            prompt: "goroutine 1 frame 0>",
            line: 6,
        },
        TestCase {
            cmd: "up",
            prompt: "goroutine 1 frame 1>",
            line: 3,
        },
        TestCase {
            cmd: "up",
            prompt: "goroutine 1 frame 0>",
            line: 6,
        },
    ];
    for tc in cases {
        run(&dispatcher, tc.cmd);
        assert_eq!(dispatcher.prompt(), tc.prompt, "{}", tc.cmd);
        assert_eq!(
            session.lock().listing.current_line(),
            Some(tc.line - 1),
            "{}",
            tc.cmd
        );
        assert_eq!(
            cleared.take(),
            BTreeSet::from([PanelKind::Locals, PanelKind::Expressions])
        );
    }
}

#[test]
fn test_breakpoints() {
    let src = SourceFile::new("bp.go", MAIN_GO);
    let client = FakeClient::new(stopped_in(&src));
    let (session, cleared) = connected_session(client.clone());
    let dispatcher = Dispatcher::new(session.clone());

    run(&dispatcher, &format!("break {}:5", src.path_str()));
    let expected = format!("Breakpoint 1 set at {}:5\n", src.path_str());
    assert!(session.lock().output.text().contains(&expected));
    assert_eq!(cleared.take(), BTreeSet::from([PanelKind::Breakpoints]));
    assert!(session.lock().listing.lines[4].breakpoint.is_some());

    run(&dispatcher, "b main.main");
    assert!(session
        .lock()
        .output
        .text()
        .contains("Breakpoint 2 set at main.main"));

    run(&dispatcher, "clear 1");
    let expected = format!("Breakpoint 1 cleared at {}:5\n", src.path_str());
    assert!(session.lock().output.text().contains(&expected));
    assert!(session.lock().listing.lines[4].breakpoint.is_none());

    run(&dispatcher, "clear 1");
    assert!(session
        .lock()
        .output
        .text()
        .contains("Command failed: ClearBreakpoint(): no breakpoint with id 1\n"));
}

#[test]
fn test_print_and_display() {
    let src = SourceFile::new("print.go", MAIN_GO);
    let client = FakeClient::new(stopped_in(&src));
    let (session, cleared) = connected_session(client.clone());
    let dispatcher = Dispatcher::new(session.clone());

    run(&dispatcher, "print x");
    assert!(session.lock().output.text().contains("x = 42\n"));
    assert_eq!(client.called("Eval"), 1);

    cleared.take();
    run(&dispatcher, "display len(s)");
    assert_eq!(session.lock().expressions, ["len(s)"]);
    assert_eq!(cleared.take(), BTreeSet::from([PanelKind::Expressions]));
    assert_eq!(client.called("Eval"), 1);
}

#[test]
fn test_continue_to_exit() {
    let client = FakeClient::new(Script {
        state: DebuggerState {
            exited: true,
            exit_status: 3,
            ..Default::default()
        },
        ..Default::default()
    });
    let (session, _) = connected_session(client);
    let dispatcher = Dispatcher::new(session.clone());

    run(&dispatcher, "continue");

    let st = session.lock();
    assert!(st
        .output
        .text()
        .contains("Process has exited with status 3\n"));
    assert_eq!(st.prompt(), "dlv>");
}

#[test]
fn test_remote_failure() {
    let src = SourceFile::new("failure.go", MAIN_GO);
    let mut script = stopped_in(&src);
    script.failing.insert("Next");
    let client = FakeClient::new(script);
    let (session, _) = connected_session(client.clone());
    let dispatcher = Dispatcher::new(session.clone());

    run(&dispatcher, "n");

    assert_eq!(client.called("GetState"), 0);
    let st = session.lock();
    assert!(st
        .output
        .text()
        .contains("Command failed: Next(): Next failed\n"));
    assert!(!st.running);
    assert!(!st.command_line.read_only);
}

#[test]
fn test_restart() {
    let src = SourceFile::new("restart.go", MAIN_GO);
    let client = FakeClient::new(stopped_in(&src));
    let (session, cleared) = connected_session(client.clone());
    let dispatcher = Dispatcher::new(session.clone());

    run(&dispatcher, "restart");

    assert_eq!(client.called("Restart"), 1);
    assert_eq!(client.called("GetState"), 1);
    assert_eq!(cleared.take().len(), 8);
    assert!(session.lock().output.text().contains("Process restarted\n"));
}
