use repctl::config::{AlignmentCheck, CurlThresholds, Profile, SessionThresholds, SquatThresholds};
use repctl::counters::{CurlMode, Exercise, Feedback, RepCounter, SquatCounter, build_counter};
use repctl::keypoints::{Frame, Joint, KEYPOINT_COUNT, Keypoint};
use repctl::session::{CurlSession, SessionPhase};

fn blank() -> Vec<Keypoint> {
    vec![Keypoint::new(0.0, 0.0, 1.0); KEYPOINT_COUNT]
}

fn set(kps: &mut [Keypoint], joint: Joint, p: (f32, f32)) {
    kps[joint.index()] = Keypoint::new(p.0, p.1, 1.0);
}

/// End of a `len` ray from `b`, turned `deg` away from the ray `b→a`.
fn ray(a: (f32, f32), b: (f32, f32), deg: f32, len: f32) -> (f32, f32) {
    let th = (a.1 - b.1).atan2(a.0 - b.0) + deg.to_radians();
    (b.0 + len * th.cos(), b.1 + len * th.sin())
}

fn standing_squat(knee_deg: f32) -> Vec<Keypoint> {
    let mut kps = blank();
    let hip = (320.0, 260.0);
    let knee = (320.0, 360.0);
    set(&mut kps, Joint::LeftShoulder, (320.0, 120.0));
    set(&mut kps, Joint::LeftHip, hip);
    set(&mut kps, Joint::LeftKnee, knee);
    set(&mut kps, Joint::LeftAnkle, ray(hip, knee, knee_deg, 100.0));
    kps
}

#[test]
fn squat_session_counts_one_rep() {
    // one frame per second, far apart enough that the moving average would
    // lag the sweep; a window of one feeds the raw knee angle straight through
    let mut counter = SquatCounter::new(SquatThresholds {
        bent: 120.0,
        extended: 165.0,
        min_rep_interval_ms: 500,
        smoothing_window: 1,
        ..SquatThresholds::default()
    })
    .unwrap();

    let knees = [170.0, 150.0, 110.0, 95.0, 130.0, 170.0];
    let mut last = None;
    for (i, deg) in knees.into_iter().enumerate() {
        let frame = Frame::new(i as u64 * 1000, standing_squat(deg));
        last = Some(counter.process(&frame));
    }
    let last = last.unwrap();
    assert_eq!(counter.count(), 1);
    assert_eq!(last.count, 1);
    assert_eq!(last.feedback, Feedback::Up);
    assert_eq!(last.feedback.label(), "Up");
}

const LS: (f32, f32) = (260.0, 140.0);
const RS: (f32, f32) = (380.0, 140.0);
const LE: (f32, f32) = (260.0, 210.0);
const RE: (f32, f32) = (380.0, 210.0);

fn curl_body(left_deg: f32, right_deg: f32) -> Vec<Keypoint> {
    let mut kps = blank();
    set(&mut kps, Joint::Nose, (320.0, 80.0));
    set(&mut kps, Joint::LeftShoulder, LS);
    set(&mut kps, Joint::RightShoulder, RS);
    set(&mut kps, Joint::LeftElbow, LE);
    set(&mut kps, Joint::RightElbow, RE);
    set(&mut kps, Joint::LeftWrist, ray(LS, LE, left_deg, 70.0));
    set(&mut kps, Joint::RightWrist, ray(RS, RE, right_deg, 70.0));
    kps
}

fn arms_crossed() -> Vec<Keypoint> {
    let mut kps = curl_body(170.0, 170.0);
    set(&mut kps, Joint::LeftWrist, (370.0, 150.0));
    set(&mut kps, Joint::RightWrist, (270.0, 150.0));
    kps
}

fn left_arm_out() -> Vec<Keypoint> {
    let mut kps = curl_body(170.0, 170.0);
    set(&mut kps, Joint::LeftWrist, (170.0, 150.0));
    kps
}

struct Clock(u64);

impl Clock {
    fn frame(&mut self, kps: Vec<Keypoint>) -> Frame {
        self.0 += 33;
        Frame::new(self.0, kps)
    }
}

#[test]
fn curl_session_counts_left_arm_only() {
    let curl = CurlThresholds::default();
    let mut session = CurlSession::new(curl, SessionThresholds::default()).unwrap();
    let mut clock = Clock(0);

    let r = session.process(&clock.frame(arms_crossed()));
    assert_eq!(r.phase, SessionPhase::Calibrating);

    for _ in 0..30 {
        session.process(&clock.frame(curl_body(170.0, 170.0)));
    }
    assert_eq!(session.phase(), SessionPhase::Active);
    assert!(session.baseline().unwrap().abs() < 1e-3);

    for _ in 0..31 {
        session.process(&clock.frame(left_arm_out()));
    }
    assert_eq!(session.mode(), CurlMode::Left);
    for _ in 0..5 {
        session.process(&clock.frame(curl_body(170.0, 170.0)));
    }

    let mut sweep: Vec<f32> = (0..=12).map(|i| 160.0 - i as f32 * 10.0).collect();
    sweep.extend([45.0; 5]);
    sweep.extend((0..=12).map(|i| 45.0 + i as f32 * 10.0));
    sweep.extend([170.0; 5]);

    let mut last = None;
    for deg in sweep {
        last = Some(session.process(&clock.frame(curl_body(deg, 170.0))));
    }
    let last = last.unwrap();
    assert_eq!(last.left_count, 1);
    assert_eq!(last.right_count, 0);
    assert_eq!(last.reading.count, 1);
    assert!(!last.posture_alert);
}

fn plank(elbow_deg: f32, hip_drop: f32) -> Vec<Keypoint> {
    let mut kps = blank();
    for (s, e, w, y) in [
        (Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist, 200.0),
        (Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist, 206.0),
    ] {
        let shoulder = (120.0, y);
        let elbow = (120.0, y + 70.0);
        set(&mut kps, s, shoulder);
        set(&mut kps, e, elbow);
        set(&mut kps, w, ray(shoulder, elbow, elbow_deg, 70.0));
    }
    set(&mut kps, Joint::LeftHip, (360.0, 200.0 + hip_drop));
    set(&mut kps, Joint::RightHip, (360.0, 206.0 + hip_drop));
    kps
}

fn pushups_with(alignment: AlignmentCheck, hip_drop: f32) -> u32 {
    let mut profile = Profile::default();
    profile.pushup.alignment = alignment;
    profile.pushup.smoothing_window = 1;
    let mut counter = build_counter(Exercise::Pushups, &profile).unwrap();
    let elbows = [170.0, 80.0, 170.0, 80.0, 170.0];
    for (i, deg) in elbows.into_iter().enumerate() {
        counter.process(&Frame::new(i as u64 * 500, plank(deg, hip_drop)));
    }
    counter.count()
}

#[test]
fn pushup_alignment_setting_decides_whether_bad_form_counts() {
    assert_eq!(pushups_with(AlignmentCheck::Enforce, 0.0), 2);
    assert_eq!(pushups_with(AlignmentCheck::Enforce, 300.0), 0);
    assert_eq!(pushups_with(AlignmentCheck::Advisory, 300.0), 2);
}

#[test]
fn squat_alignment_setting_decides_whether_leaning_counts() {
    let lean = |deg: f32| {
        let mut kps = standing_squat(deg);
        set(&mut kps, Joint::LeftShoulder, (450.0, 150.0));
        kps
    };
    for alignment in [AlignmentCheck::Enforce, AlignmentCheck::Advisory] {
        let expected = match alignment {
            AlignmentCheck::Enforce => 0,
            _ => 2,
        };
        let mut c = SquatCounter::new(SquatThresholds {
            smoothing_window: 1,
            alignment,
            ..SquatThresholds::default()
        })
        .unwrap();
        let knees = [170.0, 100.0, 170.0, 100.0, 170.0];
        for (i, deg) in knees.into_iter().enumerate() {
            c.process(&Frame::new(i as u64 * 1000, lean(deg)));
        }
        assert_eq!(c.count(), expected, "{alignment:?}");
    }
}

#[test]
fn rejected_frames_never_move_any_counter() {
    let profile = Profile::default();
    for exercise in [Exercise::Curls, Exercise::Pushups, Exercise::Squats] {
        let mut c = build_counter(exercise, &profile).unwrap();
        let before = c.phase();
        let r = c.process(&Frame::new(0, vec![Keypoint::new(1.0, 1.0, 1.0); 5]));
        assert_eq!(r.feedback, Feedback::InsufficientKeypoints);
        assert_eq!(r.angle, None);
        let unseen = vec![Keypoint::new(1.0, 1.0, 0.0); KEYPOINT_COUNT];
        let r = c.process(&Frame::new(1, unseen));
        assert_eq!(r.feedback, Feedback::InsufficientKeypoints);
        assert_eq!(c.count(), 0);
        assert_eq!(c.phase(), before);
    }
}
