//! Property tests for the delta engine.

use delta_patcher::delta::lines;
use delta_patcher::{apply_operations, Context, DeltaError, Document, Location, Operation};
use proptest::prelude::*;

/// Lines plus trailing-newline flag that render and re-parse to themselves:
/// an unterminated document cannot end in an empty line.
fn document() -> impl Strategy<Value = (Vec<String>, bool)> {
    (prop::collection::vec("[a-z ]{0,8}", 1..20), any::<bool>()).prop_filter(
        "unterminated document ending in an empty line",
        |(lines, trailing)| *trailing || lines.last().is_some_and(|line| !line.is_empty()),
    )
}

fn render(lines: &[String], trailing_newline: bool) -> String {
    Document::from_parts(lines.to_vec(), trailing_newline).render()
}

/// Text whose lines are all different, so every context matches once.
fn distinct_text(count: usize) -> String {
    (0..count).map(|n| format!("line {n}\n")).collect()
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

fn intersects(a: (usize, usize), b: (usize, usize)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

/// Replace everything between line `before` and line `after` (0-based).
fn replace_between(before: usize, after: usize) -> Operation {
    Operation::replace(
        Context::before(format!("line {before}")).with_after(format!("line {after}")),
        "new\n",
    )
}

/// Positions claimed by [`replace_between`]: the before line through the
/// last replaced line, or the insertion point when nothing lies between.
fn between_footprint(before: usize, after: usize) -> (usize, usize) {
    (before, (after - 1).max(before + 1))
}

fn is_overlap(result: &Result<String, DeltaError>) -> bool {
    matches!(result, Err(DeltaError::OverlapConflict { .. }))
}

proptest! {
    #[test]
    fn empty_batch_is_identity(text in "[a-z\n]{0,64}") {
        prop_assert_eq!(apply_operations(&text, &[]).unwrap(), text);
    }

    #[test]
    fn parse_render_round_trip(text in "[a-z \n]{0,64}") {
        prop_assert_eq!(Document::parse(&text).render(), text);
    }

    #[test]
    fn replacing_a_range_with_itself_is_identity(
        (doc_lines, trailing) in document(),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let text = render(&doc_lines, trailing);
        let (first, last) = {
            let (x, y) = (a.index(doc_lines.len()), b.index(doc_lines.len()));
            (x.min(y), x.max(y))
        };
        let content = format!("{}\n", lines::join(&doc_lines[first..=last]));
        let ops = [Operation::replace(
            Location::lines(first as i64 + 1, Some(last as i64 + 1)),
            content,
        )];

        prop_assert_eq!(apply_operations(&text, &ops).unwrap(), text);
    }

    #[test]
    fn disjoint_batches_are_order_independent(
        (doc_lines, trailing) in document(),
        picks in prop::collection::btree_set(0usize..20, 1..6),
    ) {
        let text = render(&doc_lines, trailing);
        let count = doc_lines.len();
        let ops: Vec<Operation> = picks
            .iter()
            .filter(|&&line| line < count)
            .enumerate()
            .map(|(n, &line)| {
                let number = line as i64 + 1;
                if n % 2 == 0 {
                    Operation::delete(Location::lines(number, Some(number)))
                } else {
                    Operation::replace(Location::lines(number, Some(number)), format!("r{n}\n"))
                }
            })
            .collect();
        let mut reversed = ops.clone();
        reversed.reverse();

        prop_assert_eq!(
            apply_operations(&text, &ops).unwrap(),
            apply_operations(&text, &reversed).unwrap()
        );
    }

    #[test]
    fn insert_adds_exactly_its_lines(
        (doc_lines, trailing) in document(),
        at in any::<prop::sample::Index>(),
        added in prop::collection::vec("[a-z]{1,5}", 1..4),
    ) {
        let text = render(&doc_lines, trailing);
        let point = at.index(doc_lines.len() + 1);
        let content = format!("{}\n", lines::join(&added));
        let ops = [Operation::insert(Location::lines(point as i64, None), content)];

        let patched = Document::parse(&apply_operations(&text, &ops).unwrap());
        prop_assert_eq!(patched.line_count(), doc_lines.len() + added.len());
        prop_assert_eq!(&patched.lines()[point..point + added.len()], &added[..]);
        prop_assert_eq!(patched.trailing_newline(), trailing);
    }

    #[test]
    fn touching_the_same_line_twice_is_rejected(
        (doc_lines, trailing) in document(),
        at in any::<prop::sample::Index>(),
    ) {
        let text = render(&doc_lines, trailing);
        let number = at.index(doc_lines.len()) as i64 + 1;
        let ops = [
            Operation::replace(Location::lines(number, Some(number)), "x\n"),
            Operation::delete(Location::lines(number, Some(number))),
        ];

        let is_overlap = matches!(
            apply_operations(&text, &ops),
            Err(DeltaError::OverlapConflict { .. })
        );
        prop_assert!(is_overlap);
    }

    #[test]
    fn line_ranges_conflict_exactly_when_they_intersect(
        count in 1usize..20,
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
        c in any::<prop::sample::Index>(),
        d in any::<prop::sample::Index>(),
    ) {
        let text = distinct_text(count);
        let first = ordered(a.index(count), b.index(count));
        let second = ordered(c.index(count), d.index(count));
        let ops = [
            Operation::delete(Location::lines(first.0 as i64 + 1, Some(first.1 as i64 + 1))),
            Operation::replace(
                Location::lines(second.0 as i64 + 1, Some(second.1 as i64 + 1)),
                "x\n",
            ),
        ];

        let result = apply_operations(&text, &ops);
        prop_assert_eq!(is_overlap(&result), intersects(first, second));
        prop_assert!(is_overlap(&result) || result.is_ok());
    }

    #[test]
    fn context_replacements_conflict_exactly_when_footprints_intersect(
        count in 2usize..20,
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
        c in any::<prop::sample::Index>(),
        d in any::<prop::sample::Index>(),
    ) {
        let text = distinct_text(count);
        let first = ordered(a.index(count), b.index(count));
        let second = ordered(c.index(count), d.index(count));
        prop_assume!(first.0 < first.1 && second.0 < second.1);

        let ops = [
            replace_between(first.0, first.1),
            replace_between(second.0, second.1),
        ];
        let expected = intersects(
            between_footprint(first.0, first.1),
            between_footprint(second.0, second.1),
        );

        let result = apply_operations(&text, &ops);
        prop_assert_eq!(is_overlap(&result), expected);
        prop_assert!(is_overlap(&result) || result.is_ok());
    }

    #[test]
    fn inserts_conflict_with_context_replacements_they_land_in(
        count in 2usize..20,
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
        at in any::<prop::sample::Index>(),
    ) {
        let text = distinct_text(count);
        let (before, after) = ordered(a.index(count), b.index(count));
        prop_assume!(before < after);
        let point = at.index(count + 1);

        let ops = [
            replace_between(before, after),
            Operation::insert(Location::lines(point as i64, None), "x\n"),
        ];
        let expected = intersects(between_footprint(before, after), (point, point));

        let result = apply_operations(&text, &ops);
        prop_assert_eq!(is_overlap(&result), expected);
        prop_assert!(is_overlap(&result) || result.is_ok());
    }
}
