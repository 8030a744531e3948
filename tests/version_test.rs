use scmver::domain::{next_version, LocalVersion};
use scmver::{RepositoryState, Version};
use std::cmp::Ordering;

const SAMPLES: &[&str] = &[
    "1.0",
    "v1.0.0",
    "1!2.0",
    "1.0a",
    "1.0-alpha.2",
    "1.0RC1",
    "1.0c3",
    "1.0-1",
    "1.0_post_3",
    "1.0.dev",
    "1.0a1.post2.dev3",
    "1.0+ubuntu-1",
    "1.0.POST",
];

fn v(text: &str) -> Version {
    Version::parse(text).unwrap()
}

#[test]
fn test_render_reparses_to_same_version() {
    for text in SAMPLES {
        let version = v(text);
        assert_eq!(v(&version.to_string()), version, "{}", text);
    }
}

#[test]
fn test_normalize_is_idempotent_and_keeps_precedence() {
    for text in SAMPLES {
        let version = v(text);
        let normal = version.normalize();
        assert_eq!(normal.normalize(), normal, "{}", text);
        assert_eq!(
            normal.cmp_precedence(&version),
            Ordering::Equal,
            "{}",
            text
        );
    }
}

#[test]
fn test_precedence_chain() {
    let chain = [
        "1.0.dev0", "1.0a0", "1.0a1", "1.0b0", "1.0rc0", "1.0", "1.0+local", "1.0.post0",
        "1.0.post1", "1.1.dev0", "1!0.1",
    ];
    for pair in chain.windows(2) {
        assert_eq!(
            v(pair[0]).cmp_precedence(&v(pair[1])),
            Ordering::Less,
            "{} < {}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn test_bumps_increase_precedence() {
    let cases = [
        ("1.0", "post"),
        ("1.0.post1", "post"),
        ("1.0-1", "post"),
        ("1.0a", "pre"),
        ("1.0.dev", "dev"),
        ("1.0", "major"),
        ("1.0", "minor"),
        ("1.0", "micro"),
        ("1.0rc1", "patch"),
        ("1.0", "minor.dev"),
    ];
    for (text, spec) in cases {
        for value in 1..4 {
            let before = v(text);
            let mut after = before.clone();
            after.update(spec, value).unwrap();
            assert_eq!(
                after.cmp_precedence(&before),
                Ordering::Greater,
                "{} {} {}",
                text,
                spec,
                value
            );
        }
    }
}

#[test]
fn test_next_version_increases_with_distance() {
    let mut previous: Option<Version> = None;
    for distance in 0..5 {
        let state = RepositoryState {
            tag: "v1.0".to_string(),
            distance,
            ..Default::default()
        };
        let next = v(&next_version(&state, "post", &LocalVersion::default(), None).unwrap());
        if let Some(previous) = &previous {
            assert_eq!(next.cmp_precedence(previous), Ordering::Greater);
        }
        previous = Some(next);
    }
}
