mod common;

use chrono::NaiveTime;
use common::RawRecord;
use procsnoop::error::DecodeError;
use procsnoop::event::{self, decode, render_at};
use procsnoop_common::PROCESS_EVENT_SIZE;

fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 34, 56).unwrap()
}

#[test]
fn exec_record_renders_pid_ppid_comm_and_filename() {
    let raw = RawRecord::exec(4242, 1, "bash", "/usr/bin/bash").to_bytes();
    let event = decode(&raw).unwrap();

    assert!(!event.is_exit());
    assert_eq!(event.pid, 4242);
    assert_eq!(event.ppid, 1);
    assert_eq!(
        render_at(&event, noon()),
        "12:34:56 EXEC  bash             4242    1       /usr/bin/bash"
    );
}

#[test]
fn comm_padding_is_trimmed() {
    let raw = RawRecord::exec(10, 2, "bash", "/bin/bash").to_bytes();
    let event = decode(&raw).unwrap();

    assert_eq!(event::comm(&event), "bash");
    let line = render_at(&event, noon());
    assert!(!line.contains('\0'));
    assert!(line.contains(" bash "));
}

#[test]
fn full_width_comm_without_nul_is_kept_whole() {
    let raw = RawRecord::exec(10, 2, "kworker/u16:3-ev", "/x").to_bytes();
    let event = decode(&raw).unwrap();
    assert_eq!(event::comm(&event), "kworker/u16:3-ev");
}

#[test]
fn exit_duration_is_truncated_to_whole_milliseconds() {
    let raw = RawRecord::exit(77, 76, "sleep", 0, 2_500_000).to_bytes();
    let event = decode(&raw).unwrap();

    assert_eq!(
        render_at(&event, noon()),
        "12:34:56 EXIT  sleep            77      76      [0] (2ms)"
    );
}

#[test]
fn exit_without_duration_has_no_suffix() {
    let raw = RawRecord::exit(77, 76, "false", 1, 0).to_bytes();
    let event = decode(&raw).unwrap();

    let line = render_at(&event, noon());
    assert!(line.ends_with("[1]"), "unexpected line: {line}");
    assert!(!line.contains("ms)"));
}

#[test]
fn any_nonzero_flag_marks_an_exit() {
    let mut record = RawRecord::exit(5, 4, "sh", 3, 0);
    record.exit_event = 0x80;
    let event = decode(&record.to_bytes()).unwrap();
    assert!(event.is_exit());
    assert!(render_at(&event, noon()).contains("EXIT"));
}

#[test]
fn exit_ignores_stale_filename_bytes() {
    let mut record = RawRecord::exit(5, 4, "sh", 0, 0);
    record.filename = b"/should/not/show".to_vec();
    let event = decode(&record.to_bytes()).unwrap();
    assert!(!render_at(&event, noon()).contains("/should/not/show"));
}

#[test]
fn wrong_length_is_rejected() {
    let raw = RawRecord::exec(1, 0, "init", "/sbin/init").to_bytes();

    for len in [0, 1, PROCESS_EVENT_SIZE - 1, PROCESS_EVENT_SIZE + 1, 2 * PROCESS_EVENT_SIZE] {
        let mut data = raw.to_vec();
        data.resize(len, 0);
        assert_eq!(
            decode(&data),
            Err(DecodeError::Length {
                expected: PROCESS_EVENT_SIZE,
                actual: len
            })
        );
    }
}

#[test]
fn non_utf8_comm_is_rendered_lossily() {
    let mut record = RawRecord::exec(9, 8, "", "/tmp/x");
    record.comm = vec![b'a', 0xff, b'b'];
    let event = decode(&record.to_bytes()).unwrap();
    assert_eq!(event::comm(&event), "a\u{fffd}b");
}
