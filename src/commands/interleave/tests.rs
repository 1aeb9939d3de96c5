use std::path::PathBuf;

use serde_json::{Map, json};

use crate::cli::InterleaveArgs;
use crate::model::{Fragment, FragmentDocument};

use super::markers::{Marker, MarkerKind, MarkerPatterns};
use super::run::{interleave_document, render_interleave_command};
use super::solution_groups::{Layout, interleave_solutions};

fn text(value: &str) -> Fragment {
    Fragment::Text {
        text: value.to_string(),
        extra: Map::new(),
    }
}

fn patterns() -> MarkerPatterns {
    MarkerPatterns::new().expect("marker regexes compile")
}

fn group_parts(fragment: &Fragment) -> (&str, &str, &[Fragment]) {
    match fragment {
        Fragment::SolutionGroup { id, label, fragments } => (id.as_str(), label.as_str(), fragments.as_slice()),
        other => panic!("expected solution group, got {other:?}"),
    }
}

#[test]
fn scan_checks_solution_markers_before_problem_markers() {
    let fragments = vec![
        text("## Hand #4\nYou hold AKQ2"),
        text("Deal 12: North deals"),
        text("Solutions are on page 9"),
        text("Solution to Problem 3"),
        text("> Answer b. Lead a trump"),
    ];

    let markers = patterns().scan(&fragments);

    assert_eq!(
        markers,
        vec![
            Marker {
                index: 0,
                kind: MarkerKind::Problem,
                id: Some("4".to_string()),
            },
            Marker {
                index: 1,
                kind: MarkerKind::Problem,
                id: Some("12".to_string()),
            },
            Marker {
                index: 3,
                kind: MarkerKind::Solution,
                id: Some("3".to_string()),
            },
            Marker {
                index: 4,
                kind: MarkerKind::Solution,
                id: Some("B".to_string()),
            },
        ]
    );
}

#[test]
fn grouped_solutions_move_behind_their_problems() {
    let fragments = vec![
        text("**Problem A** West leads the king of spades."),
        text("**Problem B** You hold a balanced 16 count."),
        text("**Solution A** Win the ace and draw trumps."),
        text("**Solution B** Open 1NT."),
    ];

    let result = interleave_solutions(fragments.clone(), &patterns()).expect("interleave succeeds");

    assert_eq!(result.layout, Layout::Grouped);
    assert_eq!(result.groups_created, 2);
    assert_eq!(result.unmatched_runs, 0);
    assert_eq!(result.fragments.len(), 4);
    assert_eq!(result.fragments[0], fragments[0]);
    assert_eq!(result.fragments[2], fragments[1]);

    let (id, label, wrapped) = group_parts(&result.fragments[1]);
    assert!(id.starts_with("sg-"));
    assert_eq!(id.len(), 15);
    assert_eq!(label, "Solution A");
    assert_eq!(wrapped, &fragments[2..3]);

    let (_, label, wrapped) = group_parts(&result.fragments[3]);
    assert_eq!(label, "Solution B");
    assert_eq!(wrapped, &fragments[3..4]);
}

#[test]
fn interleaving_its_own_output_changes_nothing() {
    let fragments = vec![
        text("Intro to this month's problems."),
        text("**Problem A** West leads the king of spades."),
        text("**Problem B** You hold a balanced 16 count."),
        text("**Solution A** Win the ace and draw trumps."),
        text("**Solution B** Open 1NT."),
    ];
    let patterns = patterns();

    let first = interleave_solutions(fragments, &patterns).expect("first pass");
    let second = interleave_solutions(first.fragments.clone(), &patterns).expect("second pass");

    assert_eq!(second.layout, Layout::Unchanged);
    assert_eq!(second.fragments, first.fragments);
    assert_eq!(first.fragments[0], text("Intro to this month's problems."));
}

#[test]
fn already_interleaved_runs_are_wrapped_in_place() {
    let fragments = vec![
        text("Problem 1"),
        text("Solution 1"),
        text("Declarer wins the ace."),
        text("Problem 2"),
        text("Solution 2"),
    ];

    let result = interleave_solutions(fragments.clone(), &patterns()).expect("interleave succeeds");

    assert_eq!(result.layout, Layout::Interleaved);
    assert_eq!(result.groups_created, 2);
    assert_eq!(result.fragments.len(), 4);
    assert_eq!(result.fragments[0], fragments[0]);
    assert_eq!(group_parts(&result.fragments[1]).2, &fragments[1..3]);
    assert_eq!(result.fragments[2], fragments[3]);
    assert_eq!(group_parts(&result.fragments[3]).2, &fragments[4..5]);
}

#[test]
fn bare_headings_take_the_problem_id_at_the_same_position() {
    let fragments = vec![
        text("Problem 1"),
        text("Solution"),
        text("Problem 2"),
        text("Solution:"),
    ];

    let result = interleave_solutions(fragments, &patterns()).expect("interleave succeeds");

    assert_eq!(result.layout, Layout::Interleaved);
    assert_eq!(group_parts(&result.fragments[1]).1, "Solution 1");
    assert_eq!(group_parts(&result.fragments[3]).1, "Solution 2");
}

#[test]
fn numbered_items_after_a_solutions_heading_are_solutions() {
    let fragments = vec![
        text("1. North opens 1NT, what do you bid?"),
        text("2. Partner doubles, what now?"),
        text("**Solutions**"),
        text("1. Bid 3NT."),
        text("2. Pass."),
    ];

    let result = interleave_solutions(fragments.clone(), &patterns()).expect("interleave succeeds");

    assert_eq!(result.layout, Layout::Grouped);
    assert_eq!(result.fragments.len(), 4);
    assert_eq!(result.fragments[0], fragments[0]);
    let (_, label, wrapped) = group_parts(&result.fragments[1]);
    assert_eq!(label, "Solution 1");
    assert_eq!(wrapped, &fragments[2..4]);
    assert_eq!(result.fragments[2], fragments[1]);
    assert_eq!(group_parts(&result.fragments[3]).2, &fragments[4..5]);
}

#[test]
fn restated_problem_headings_after_a_solutions_heading_are_solutions() {
    let fragments = vec![
        text("Problem 1"),
        text("Problem 2"),
        text("## Solutions"),
        text("Problem 1: win the ace"),
        text("Problem 2: duck"),
    ];

    let result = interleave_solutions(fragments.clone(), &patterns()).expect("interleave succeeds");

    assert_eq!(result.layout, Layout::Grouped);
    assert_eq!(result.groups_created, 2);
    assert_eq!(result.unmatched_runs, 0);
    assert_eq!(result.fragments.len(), 4);
    assert_eq!(result.fragments[0], fragments[0]);
    let (_, label, wrapped) = group_parts(&result.fragments[1]);
    assert_eq!(label, "Solution 1");
    assert_eq!(wrapped, &fragments[2..4]);
    assert_eq!(result.fragments[2], fragments[1]);
    let (_, label, wrapped) = group_parts(&result.fragments[3]);
    assert_eq!(label, "Solution 2");
    assert_eq!(wrapped, &fragments[4..5]);
}

#[test]
fn unmatched_solution_runs_are_appended_at_the_end() {
    let fragments = vec![
        text("Problem A"),
        text("Problem B"),
        text("Solution C"),
        text("Solution A"),
    ];

    let result = interleave_solutions(fragments.clone(), &patterns()).expect("interleave succeeds");

    assert_eq!(result.unmatched_runs, 1);
    assert_eq!(result.fragments.len(), 4);
    assert_eq!(group_parts(&result.fragments[1]).2, &fragments[3..4]);
    assert_eq!(result.fragments[2], fragments[1]);
    assert_eq!(group_parts(&result.fragments[3]).1, "Solution C");
}

#[test]
fn fragments_without_both_marker_kinds_are_unchanged() {
    let fragments = vec![
        text("Problem 1"),
        Fragment::Image {
            payload: json!({"src": "deal1.png"}).as_object().cloned().unwrap_or_default(),
        },
        text("Problem 2"),
    ];

    let result = interleave_solutions(fragments.clone(), &patterns()).expect("interleave succeeds");

    assert_eq!(result.layout, Layout::Unchanged);
    assert_eq!(result.fragments, fragments);
    assert_eq!(result.groups_created, 0);
}

#[test]
fn existing_groups_inside_a_run_are_flattened() {
    let existing = Fragment::SolutionGroup {
        id: "sg-000000000000".to_string(),
        label: "Old".to_string(),
        fragments: vec![text("Cash the clubs.")],
    };
    let fragments = vec![text("Problem 1"), text("Solution 1"), existing];

    let result = interleave_solutions(fragments, &patterns()).expect("interleave succeeds");

    let (_, _, wrapped) = group_parts(&result.fragments[1]);
    assert_eq!(wrapped, &[text("Solution 1"), text("Cash the clubs.")]);
    assert!(!wrapped.iter().any(Fragment::is_solution_group));
}

#[test]
fn labels_skip_bare_solution_words_and_long_phrases() {
    let patterns = patterns();

    let run = vec![text("**Solutions**"), text("1. *Lead the queen of hearts* and hope.")];
    assert_eq!(patterns.label_for(&run, Some("1")), "Lead the queen of hearts");

    let long = format!("Answer 3: **{}**", "very ".repeat(15));
    assert_eq!(patterns.label_for(&[text(&long)], Some("3")), "Solution 3");

    assert_eq!(patterns.label_for(&[text("Answer 4: __A Timely Duck__")], Some("4")), "A Timely Duck");
    assert_eq!(patterns.label_for(&[text("no emphasis")], None), "Solution");
}

#[test]
fn group_ids_are_content_addressed() {
    let patterns = patterns();
    let fragments = vec![text("Problem 1"), text("Solution 1"), text("Problem 2"), text("Solution 2")];

    let first = interleave_solutions(fragments.clone(), &patterns).expect("first run");
    let again = interleave_solutions(fragments, &patterns).expect("second run");

    let first_id = group_parts(&first.fragments[1]).0;
    assert_eq!(first_id, group_parts(&again.fragments[1]).0);
    assert_ne!(first_id, group_parts(&first.fragments[3]).0);
}

#[test]
fn document_interleave_keeps_opaque_payloads() {
    let document: FragmentDocument = serde_json::from_value(json!({
        "articles": [
            {
                "title": "Test Your Play",
                "fragments": [
                    {"type": "text", "text": "**Problem A** Plan the play.", "page": 7},
                    {"type": "cardHandDiagram", "north": "AK2 QJ3 K84 A976"},
                    {"type": "text", "text": "**Solution A** Duck the first heart."}
                ]
            },
            {
                "title": "Editorial",
                "fragments": [{"type": "text", "text": "Welcome to the April issue."}]
            }
        ]
    }))
    .expect("valid fragment document");

    let (document, counts) = interleave_document(document, &patterns()).expect("interleave succeeds");

    assert_eq!(counts.article_count, 2);
    assert_eq!(counts.grouped_articles, 1);
    assert_eq!(counts.unchanged_articles, 1);
    assert_eq!(counts.solution_groups_created, 1);

    let encoded = serde_json::to_value(&document).expect("serializes");
    let fragments = &encoded["articles"][0]["fragments"];
    assert_eq!(fragments[0]["page"], json!(7));
    assert_eq!(fragments[1]["type"], json!("cardHandDiagram"));
    assert_eq!(fragments[1]["north"], json!("AK2 QJ3 K84 A976"));
    assert_eq!(fragments[2]["type"], json!("solutionGroup"));
    assert_eq!(fragments[2]["label"], json!("Solution A"));
}

#[test]
fn render_interleave_command_lists_overrides() {
    let args = InterleaveArgs {
        input: PathBuf::from("fragments.json"),
        out_dir: PathBuf::from(".cache/issue-reconcile"),
        output_path: Some(PathBuf::from("out.json")),
        manifest_path: None,
    };

    assert_eq!(
        render_interleave_command(&args),
        "issue-reconcile interleave --input fragments.json --out-dir .cache/issue-reconcile --output-path out.json"
    );
}
