// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for the height map.
//!
//! 1. Length, cached aggregates, and depth stay consistent through random edit batches.
//! 2. Rows tile the document, and offset and height queries find them again.
//! 3. Measuring the same window twice changes nothing the second time.
//! 4. A collapsed range counts as one row however many lines it hides.
//! 5. Applying text and overlay edits one by one gives the same map as building the
//!    edited document from scratch.

use proptest::prelude::*;
use understory_height_map::{ChangedRange, HeightMap, HeightOracle, MeasuredLine, Overlay, RowInfo};

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum Step {
    Edit {
        at: usize,
        span: usize,
        text: String,
    },
    TwoEdits {
        at: usize,
        span: usize,
        text: String,
        gap: usize,
        span2: usize,
        text2: String,
    },
    Measure {
        first: usize,
        count: usize,
        seed: u32,
    },
}

fn text_strategy(max: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![Just('a'), Just('b'), Just('\n')], 0..=max)
        .prop_map(|chars| chars.into_iter().collect())
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (any::<usize>(), 0usize..16, text_strategy(12))
            .prop_map(|(at, span, text)| Step::Edit { at, span, text }),
        (
            any::<usize>(),
            0usize..8,
            text_strategy(6),
            0usize..12,
            0usize..8,
            text_strategy(6)
        )
            .prop_map(|(at, span, text, gap, span2, text2)| Step::TwoEdits {
                at,
                span,
                text,
                gap,
                span2,
                text2,
            }),
        (any::<usize>(), 1usize..8, any::<u32>())
            .prop_map(|(first, count, seed)| Step::Measure { first, count, seed }),
    ]
}

fn replace(doc: &str, from: usize, to: usize, text: &str) -> String {
    let mut out = String::with_capacity(doc.len() + text.len());
    out.push_str(&doc[..from]);
    out.push_str(text);
    out.push_str(&doc[to..]);
    out
}

fn build(doc: &str, overlays: &[Overlay]) -> HeightMap {
    HeightMap::empty().apply_changes(
        &HeightOracle::new(doc),
        &[&overlays],
        &[ChangedRange::new(0, 0, 0, doc.len())],
    )
}

fn rows(map: &HeightMap, doc: &str) -> Vec<RowInfo> {
    let mut rows = Vec::new();
    map.for_each_row(&HeightOracle::new(doc), 0, doc.len(), |row| rows.push(row));
    rows
}

/// Length of a row's text without its line break.
fn text_len(doc: &str, row: &RowInfo) -> usize {
    if row.length > 0 && doc.as_bytes()[row.to() - 1] == b'\n' {
        row.length - 1
    } else {
        row.length
    }
}

fn check(map: &HeightMap, doc: &str) -> Result<(), TestCaseError> {
    prop_assert_eq!(map.length(), doc.len());
    map.check_invariants();
    let bits = (usize::BITS - map.size().leading_zeros()) as usize;
    prop_assert!(
        map.depth() <= 2 * bits + 2,
        "depth {} for {} rows",
        map.depth(),
        map.size()
    );

    let oracle = HeightOracle::new(doc);
    let rows = rows(map, doc);
    prop_assert!(!rows.is_empty());
    prop_assert_eq!(rows[0].from, 0);
    prop_assert_eq!(rows[rows.len() - 1].to(), doc.len());
    for pair in rows.windows(2) {
        prop_assert_eq!(pair[0].to(), pair[1].from, "rows must tile the document");
    }
    for row in &rows {
        prop_assert_eq!(map.row_at_offset(&oracle, row.from), *row);
        if row.height > 0.0 {
            let middle = row.top + row.height / 2.0;
            prop_assert_eq!(map.offset_at_height(&oracle, middle), row.from);
        }
    }
    Ok(())
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Random edits and measurements
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn follows_edits_and_measurements(
        initial in text_strategy(40),
        steps in prop::collection::vec(step_strategy(), 1..24),
    ) {
        let mut doc = initial;
        let mut map = build(&doc, &[]);
        check(&map, &doc)?;

        for step in steps {
            match step {
                Step::Edit { at, span, text } => {
                    let from = at % (doc.len() + 1);
                    let to = from + span.min(doc.len() - from);
                    let next = replace(&doc, from, to, &text);
                    let change = ChangedRange::new(from, to, from, from + text.len());
                    map = map.apply_changes(&HeightOracle::new(next.as_str()), &[], &[change]);
                    doc = next;
                }
                Step::TwoEdits { at, span, text, gap, span2, text2 } => {
                    let from = at % (doc.len() + 1);
                    let to = from + span.min(doc.len() - from);
                    let from2 = to + gap.min(doc.len() - to);
                    let to2 = from2 + span2.min(doc.len() - from2);
                    let next = replace(&replace(&doc, from2, to2, &text2), from, to, &text);
                    let from2_b = from2 + text.len() - (to - from);
                    let changes = [
                        ChangedRange::new(from, to, from, from + text.len()),
                        ChangedRange::new(from2, to2, from2_b, from2_b + text2.len()),
                    ];
                    map = map.apply_changes(&HeightOracle::new(next.as_str()), &[], &changes);
                    doc = next;
                }
                Step::Measure { first, count, seed } => {
                    let oracle = HeightOracle::new(doc.as_str());
                    let all = rows(&map, &doc);
                    let i = first % all.len();
                    let mut j = (i + count).min(all.len()) - 1;
                    // The empty final row sits on the edge of the row before it.
                    if j + 1 < all.len() && all[j + 1].length == 0 {
                        j += 1;
                    }
                    let from = all[i].from;
                    let length = all[j].to() - from;
                    let records: Vec<MeasuredLine> = all[i..=j]
                        .iter()
                        .zip(seed % 1000..)
                        .map(|(row, k)| MeasuredLine::new(text_len(&doc, row), f64::from(k % 40 + 1)))
                        .collect();

                    let measured = map.update_height(&oracle, 0, false, from, length, &records);
                    let again = measured.update_height(&oracle, 0, false, from, length, &records);
                    prop_assert!(again.ptr_eq(&measured), "second identical measurement rebuilt nodes");

                    let after = rows(&measured, &doc);
                    prop_assert_eq!(after.len(), all.len());
                    for (k, record) in records.iter().enumerate() {
                        prop_assert_eq!(after[i + k].height, record.height);
                    }
                    map = measured;
                }
            }
            check(&map, &doc)?;
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Collapsed ranges and widgets
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn collapses_count_as_one_row(
        doc in text_strategy(60),
        widgets in prop::collection::vec((any::<usize>(), 0u8..50), 0..6),
        folds in prop::collection::vec((any::<usize>(), 1usize..20), 0..4),
    ) {
        let len = doc.len();
        let widgets: Vec<(usize, f64)> = widgets
            .into_iter()
            .map(|(at, height)| (at % (len + 1), f64::from(height)))
            .collect();
        let folds: Vec<(usize, usize)> = folds
            .into_iter()
            .filter(|_| len > 0)
            .map(|(at, span)| {
                let from = at % len;
                (from, (from + span).min(len))
            })
            .collect();

        let mut overlays: Vec<Overlay> = widgets.iter().map(|&(at, h)| Overlay::widget(at, h)).collect();
        overlays.extend(folds.iter().map(|&(from, to)| Overlay::collapsed(from, to)));
        let map = build(&doc, &overlays);
        check(&map, &doc)?;

        let visible_breaks = doc
            .bytes()
            .enumerate()
            .filter(|&(pos, b)| b == b'\n' && !folds.iter().any(|&(from, to)| from <= pos && pos < to))
            .count();
        let widget_height: f64 = widgets
            .iter()
            .filter(|&&(at, _)| !folds.iter().any(|&(from, to)| from < at && at < to))
            .map(|&(_, h)| h)
            .sum();
        prop_assert_eq!(rows(&map, &doc).len(), visible_breaks + 1);
        prop_assert_eq!(map.height(), (visible_breaks + 1) as f64 * 14.0 + widget_height);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Incremental edits with overlays match a fresh build
// ═════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
enum OverlayEdit {
    Text { at: usize, span: usize, text: String },
    AddWidget { at: usize, height: u8 },
    AddFold { at: usize, span: usize },
    Remove { index: usize },
}

fn overlay_edit_strategy() -> impl Strategy<Value = OverlayEdit> {
    prop_oneof![
        (any::<usize>(), 0usize..10, text_strategy(8))
            .prop_map(|(at, span, text)| OverlayEdit::Text { at, span, text }),
        (any::<usize>(), 0u8..30).prop_map(|(at, height)| OverlayEdit::AddWidget { at, height }),
        (any::<usize>(), 1usize..16).prop_map(|(at, span)| OverlayEdit::AddFold { at, span }),
        any::<usize>().prop_map(|index| OverlayEdit::Remove { index }),
    ]
}

/// Range reported for an overlay that appeared or went away.
fn overlay_change(overlay: &Overlay) -> ChangedRange {
    ChangedRange::new(overlay.from, overlay.to, overlay.from, overlay.to)
}

proptest! {
    #[test]
    fn incremental_edits_match_a_fresh_build(
        initial in text_strategy(40),
        steps in prop::collection::vec(overlay_edit_strategy(), 1..24),
    ) {
        let mut doc = initial;
        let mut overlays: Vec<Overlay> = Vec::new();
        let mut map = build(&doc, &overlays);

        for step in steps {
            let len = doc.len();
            let (next, change) = match step {
                OverlayEdit::Text { at, span, text } => {
                    let from = at % (len + 1);
                    let to = from + span.min(len - from);
                    // Overlays touching the edit go with it; the change covers all of them.
                    let (mut lo, mut hi) = (from, to);
                    overlays.retain(|o| {
                        let touches = o.from <= to && o.to >= from;
                        if touches {
                            lo = lo.min(o.from);
                            hi = hi.max(o.to);
                        }
                        !touches
                    });
                    for o in &mut overlays {
                        if o.from > to {
                            o.from = o.from + text.len() - (to - from);
                            o.to = o.to + text.len() - (to - from);
                        }
                    }
                    let next = replace(&doc, from, to, &text);
                    (next, ChangedRange::new(lo, hi, lo, hi + text.len() - (to - from)))
                }
                OverlayEdit::AddWidget { at, height } => {
                    let widget = Overlay::widget(at % (len + 1), f64::from(height));
                    overlays.push(widget);
                    (doc.clone(), overlay_change(&widget))
                }
                OverlayEdit::AddFold { at, span } => {
                    if len == 0 {
                        continue;
                    }
                    let from = at % len;
                    let fold = Overlay::collapsed(from, (from + span).min(len));
                    overlays.push(fold);
                    (doc.clone(), overlay_change(&fold))
                }
                OverlayEdit::Remove { index } => {
                    if overlays.is_empty() {
                        continue;
                    }
                    let gone = overlays.remove(index % overlays.len());
                    (doc.clone(), overlay_change(&gone))
                }
            };

            map = map.apply_changes(&HeightOracle::new(next.as_str()), &[&overlays], &[change]);
            doc = next;
            let fresh = build(&doc, &overlays);
            prop_assert_eq!(map.to_string(), fresh.to_string());
            prop_assert_eq!(map.height(), fresh.height());
            check(&map, &doc)?;
        }
    }
}
