use erpview::parse::normalize;
use erpview::{parse, ColumnSelection, DelimiterMode};
use proptest::prelude::*;

fn cells() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z0-9]{0,4}", 0..=1000)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn normalized_rows_have_target_len(row in cells(), target in 0usize..=1000) {
        let out = normalize(row.clone(), target);
        prop_assert_eq!(out.len(), target);

        let kept = row.len().min(target);
        prop_assert_eq!(&out[..kept], &row[..kept]);
        prop_assert!(out[kept..].iter().all(String::is_empty));
    }

    #[test]
    fn normalize_is_idempotent(row in cells(), target in 0usize..=1000) {
        let once = normalize(row, target);
        let twice = normalize(once.clone(), target);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn exact_length_rows_are_untouched(row in cells()) {
        let len = row.len();
        prop_assert_eq!(normalize(row.clone(), len), row);
    }

    #[test]
    fn every_parsed_row_matches_header(widths in prop::collection::vec(0usize..12, 1..30), header_len in 1usize..10) {
        let header: Vec<String> = (0..header_len).map(|i| format!("h{i}")).collect();
        let mut text = header.join(";");
        for w in &widths {
            text.push('\n');
            let line: Vec<String> = (0..*w).map(|i| format!("v{i}")).collect();
            // an all-empty line would be dropped as blank
            text.push_str(&if line.is_empty() { "x".to_string() } else { line.join(";") });
        }
        let doc = parse(&text, DelimiterMode::Explicit).unwrap();
        prop_assert_eq!(doc.rows().len(), widths.len());
        prop_assert!(doc.rows().iter().all(|r| r.len() == header_len));
    }

    #[test]
    fn toggle_twice_restores_selection(header_len in 0usize..50, index in 0usize..60) {
        let mut sel = ColumnSelection::default_for(header_len);
        let before = sel.clone();
        sel.toggle(index);
        sel.toggle(index);
        prop_assert_eq!(sel, before);
    }

    #[test]
    fn visible_indices_are_sorted(toggles in prop::collection::vec(0usize..30, 0..40)) {
        let mut sel = ColumnSelection::new();
        for i in toggles {
            sel.toggle(i);
        }
        let visible = sel.visible_indices();
        prop_assert!(visible.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn range_ends_are_covered() {
    let wide: Vec<String> = (0..1000).map(|i| i.to_string()).collect();
    assert!(normalize(wide.clone(), 0).is_empty());
    assert_eq!(normalize(wide.clone(), 1000), wide);
    assert_eq!(normalize(Vec::new(), 1000).len(), 1000);
}
