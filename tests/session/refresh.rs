use crate::common::{
    connected_session, frame, location, stopped_at, FakeClient, Script, SourceFile, MAIN_GO,
};
use dlvtui::client::{AsmInstruction, Breakpoint, DebuggerState};
use dlvtui::session::panel::PanelKind;
use dlvtui::session::refresh::{ClearPolicy, FrameTarget, Refresher};
use std::collections::BTreeSet;
use strum::IntoEnumIterator;

fn main_go_script(src: &SourceFile, line: usize) -> Script {
    let loc = location(&src.path_str(), line, "main.main");
    Script {
        state: stopped_at(1, 1, &loc),
        frames: vec![
            frame(&src.path_str(), line, "main.main"),
            frame("/usr/lib/go/src/runtime/proc.go", 267, "runtime.main"),
        ],
        breakpoints: vec![Breakpoint {
            id: 1,
            file: src.path_str(),
            line: 5,
            function_name: "main.main".to_string(),
            ..Default::default()
        }],
        instructions: vec![AsmInstruction {
            loc: loc.clone(),
            text: "CALL fmt.Println(SB)".to_string(),
            at_pc: true,
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[test]
fn test_zero_frame_refresh() {
    let src = SourceFile::new("zero.go", MAIN_GO);
    let client = FakeClient::new(main_go_script(&src, 6));
    let (session, cleared) = connected_session(client.clone());

    Refresher::new(&session).refresh(FrameTarget::ZeroFrame, ClearPolicy::OnStop, None);

    assert_eq!(client.called("GetState"), 1);
    assert_eq!(client.called("Stacktrace"), 0);
    assert_eq!(cleared.take(), PanelKind::iter().collect::<BTreeSet<_>>());

    let st = session.lock();
    assert_eq!(st.prompt(), "goroutine 1 frame 0>");
    assert_eq!(st.listing.file, src.path_str());
    assert_eq!(st.listing.lines.len(), 7);
    assert!(st.listing.recenter);
    assert_eq!(st.listing.current_line(), Some(5));

    let current = &st.listing.lines[5];
    assert_eq!(current.idx, "  6");
    assert_eq!(current.text, "        fmt.Println(\"hello\")");
    assert_eq!(st.listing.lines[4].breakpoint.as_ref().map(|bp| bp.id), Some(1));
    assert_eq!(st.listing.lines.iter().filter(|l| l.breakpoint.is_some()).count(), 1);
    assert_eq!(st.disassembly.instructions.len(), 1);
}

#[test]
fn test_same_frame_out_of_range() {
    let src = SourceFile::new("same.go", MAIN_GO);
    let mut script = main_go_script(&src, 6);
    script.frames[1] = frame(&src.path_str(), 3, "main.caller");
    let client = FakeClient::new(script);
    let (session, _) = connected_session(client.clone());

    session.lock().cur_frame = 1;
    Refresher::new(&session).refresh(FrameTarget::SameFrame, ClearPolicy::OnFrameSwitch, None);
    {
        let st = session.lock();
        assert_eq!(st.cur_frame, 1);
        assert_eq!(st.listing.current_line(), Some(2));
        assert_eq!(st.prompt(), "goroutine 1 frame 1>");
    }

    session.lock().cur_frame = 7;
    Refresher::new(&session).refresh(FrameTarget::SameFrame, ClearPolicy::OnFrameSwitch, None);
    let st = session.lock();
    assert_eq!(st.cur_frame, 0);
    assert_eq!(st.listing.current_line(), Some(5));
    assert_eq!(st.prompt(), "goroutine 1 frame 0>");
}

#[test]
fn test_first_user_frame() {
    struct TestCase {
        frames: Vec<&'static str>,
        expected_frame: usize,
    }
    let cases = [
        TestCase {
            frames: vec!["runtime.gopark", "runtime.chanrecv", "main.worker", "main.main"],
            expected_frame: 2,
        },
        TestCase {
            frames: vec!["runtime.Breakpoint", "main.main"],
            expected_frame: 0,
        },
        TestCase {
            frames: vec!["runtime.gopark", "runtime.goexit"],
            expected_frame: 0,
        },
    ];

    for tc in cases {
        let src = SourceFile::new("user.go", MAIN_GO);
        let mut script = main_go_script(&src, 6);
        script.frames = tc
            .frames
            .iter()
            .map(|name| frame(&src.path_str(), 6, name))
            .collect();
        let client = FakeClient::new(script);
        let (session, _) = connected_session(client);

        Refresher::new(&session).refresh(
            FrameTarget::FirstUserFrame,
            ClearPolicy::OnGoroutineSwitch,
            None,
        );
        assert_eq!(session.lock().cur_frame, tc.expected_frame, "{:?}", tc.frames);
    }
}

#[test]
fn test_first_user_frame_without_stack() {
    let src = SourceFile::new("nostack.go", MAIN_GO);
    let mut script = main_go_script(&src, 3);
    script.frames.clear();
    let client = FakeClient::new(script);
    let (session, _) = connected_session(client);

    Refresher::new(&session).refresh(FrameTarget::FirstUserFrame, ClearPolicy::OnStop, None);

    let st = session.lock();
    assert_eq!(st.cur_frame, 0);
    assert_eq!(st.listing.current_line(), Some(2));
}

#[test]
fn test_state_failure() {
    let src = SourceFile::new("fail.go", MAIN_GO);
    let client = FakeClient::new(main_go_script(&src, 6));
    let (session, cleared) = connected_session(client.clone());

    Refresher::new(&session).refresh(FrameTarget::ZeroFrame, ClearPolicy::OnStop, None);
    cleared.take();
    let listing_before = session.lock().listing.lines.clone();

    client.script.lock().unwrap().failing.insert("GetState");
    Refresher::new(&session).refresh(FrameTarget::ZeroFrame, ClearPolicy::OnStop, None);

    assert!(cleared.take().is_empty());
    let st = session.lock();
    assert_eq!(st.cur_thread, -1);
    assert_eq!(st.cur_gid, -1);
    assert_eq!(st.cur_frame, 0);
    assert_eq!(st.listing.lines, listing_before);
    assert!(st
        .output
        .text()
        .contains("Error refreshing state GetState(): GetState failed\n"));
    assert_eq!(st.prompt(), "dlv>");
}

#[test]
fn test_unreadable_source() {
    let loc = location("/nonexistent/dlvtui/main.go", 10, "main.main");
    let client = FakeClient::new(Script {
        state: stopped_at(4, 1, &loc),
        instructions: vec![AsmInstruction {
            loc: loc.clone(),
            text: "NOP".to_string(),
            at_pc: true,
            ..Default::default()
        }],
        ..Default::default()
    });
    let (session, _) = connected_session(client);

    Refresher::new(&session).refresh(FrameTarget::ZeroFrame, ClearPolicy::OnStop, None);

    let st = session.lock();
    assert!(st.listing.lines.is_empty());
    assert_eq!(st.disassembly.instructions.len(), 1);
    assert!(st.output.text().contains("/nonexistent/dlvtui/main.go"));
}

#[test]
fn test_clear_policies() {
    struct TestCase {
        policy: ClearPolicy,
        expected: Vec<PanelKind>,
    }
    let cases = [
        TestCase {
            policy: ClearPolicy::OnFrameSwitch,
            expected: vec![PanelKind::Locals, PanelKind::Expressions],
        },
        TestCase {
            policy: ClearPolicy::OnGoroutineSwitch,
            expected: vec![
                PanelKind::Locals,
                PanelKind::Registers,
                PanelKind::Stack,
                PanelKind::Expressions,
            ],
        },
        TestCase {
            policy: ClearPolicy::OnBreakpointChange,
            expected: vec![PanelKind::Breakpoints],
        },
        TestCase {
            policy: ClearPolicy::OnStop,
            expected: PanelKind::iter().collect(),
        },
    ];

    let src = SourceFile::new("policy.go", MAIN_GO);
    let client = FakeClient::new(main_go_script(&src, 6));
    let (session, cleared) = connected_session(client);
    for tc in cases {
        Refresher::new(&session).refresh(FrameTarget::ZeroFrame, tc.policy, None);
        assert_eq!(
            cleared.take(),
            tc.expected.into_iter().collect::<BTreeSet<_>>(),
            "{}",
            tc.policy
        );
    }
}

#[test]
fn test_supplied_state() {
    let src = SourceFile::new("supplied.go", MAIN_GO);
    let client = FakeClient::new(main_go_script(&src, 6));
    let (session, _) = connected_session(client.clone());

    let loc = location(&src.path_str(), 1, "main.main");
    Refresher::new(&session).refresh(
        FrameTarget::ZeroFrame,
        ClearPolicy::OnStop,
        Some(stopped_at(9, -1, &loc)),
    );

    assert_eq!(client.called("GetState"), 0);
    let st = session.lock();
    assert_eq!(st.prompt(), "thread 9 frame 0>");
    assert_eq!(st.listing.current_line(), Some(0));
}

#[test]
fn test_no_location() {
    let client = FakeClient::new(Script {
        state: DebuggerState::default(),
        ..Default::default()
    });
    let (session, _) = connected_session(client.clone());

    Refresher::new(&session).refresh(FrameTarget::ZeroFrame, ClearPolicy::OnStop, None);

    assert_eq!(client.called("DisassemblePC"), 0);
    let st = session.lock();
    assert_eq!(st.prompt(), "dlv>");
    assert!(st.listing.lines.is_empty());
    assert!(!st.output.text().contains("Error"));
}
