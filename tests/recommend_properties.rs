#![allow(missing_docs)]

use std::collections::HashSet;

use bookrec::catalog::{
    BookCatalog, BookRecord, PopularityTable, SimilarityMatrix, Tables, TitleIndex,
};
use bookrec::recommend::{Recommender, UNKNOWN_AUTHOR};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Fixture {
    titles: Vec<String>,
    rows: Vec<Vec<f64>>,
    in_catalog: Vec<bool>,
}

impl Fixture {
    fn recommender(&self) -> Recommender {
        let index = TitleIndex::new(self.titles.clone()).expect("unique titles");
        let matrix = SimilarityMatrix::from_rows(self.rows.clone()).expect("square matrix");
        let records = self
            .titles
            .iter()
            .zip(&self.in_catalog)
            .filter(|(_, present)| **present)
            .enumerate()
            .map(|(idx, (title, _))| BookRecord {
                title: title.clone(),
                author: (idx % 3 != 0).then(|| format!("author of {title}")),
                image: None,
            })
            .collect();
        let tables = Tables::new(
            index,
            matrix,
            BookCatalog::from_records(records),
            PopularityTable::default(),
        )
        .expect("aligned tables");
        Recommender::new(tables)
    }

    /// Positions ranked by descending score, ties by ascending position.
    fn expected(&self, position: usize, n: usize) -> Vec<(String, f64)> {
        let mut ranked: Vec<(usize, f64)> = self.rows[position]
            .iter()
            .copied()
            .enumerate()
            .filter(|&(other, _)| other != position)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(n)
            .filter(|&(other, _)| self.in_catalog[other])
            .map(|(other, score)| (self.titles[other].clone(), score))
            .collect()
    }
}

fn fixture() -> impl Strategy<Value = Fixture> {
    prop::collection::hash_set("[a-z]{2,8}( [a-z]{2,8})?", 2..12)
        .prop_map(|set| set.into_iter().collect::<Vec<String>>())
        .prop_flat_map(|titles| {
            let len = titles.len();
            // coarse scores so ties are common
            let rows = prop::collection::vec(
                prop::collection::vec((0u8..10).prop_map(|v| f64::from(v) / 10.0), len),
                len,
            );
            let in_catalog = prop::collection::vec(prop::bool::weighted(0.8), len);
            (Just(titles), rows, in_catalog)
        })
        .prop_map(|(titles, rows, in_catalog)| Fixture {
            titles,
            rows,
            in_catalog,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn exact_title_yields_ranked_row(
        fixture in fixture(),
        pick in any::<prop::sample::Index>(),
        n in 0usize..15,
    ) {
        let recommender = fixture.recommender();
        let position = pick.index(fixture.titles.len());
        let query = fixture.titles[position].clone();

        let found = recommender.lookup(&query, n);
        if n == 0 {
            prop_assert!(found.matched.is_none());
            prop_assert!(found.results.is_empty());
            return Ok(());
        }
        prop_assert_eq!(found.matched.as_deref(), Some(query.as_str()));
        prop_assert!(found.results.len() <= n);
        prop_assert!(found.results.iter().all(|r| r.title != query));

        let actual: Vec<(String, f64)> = found
            .results
            .iter()
            .map(|r| (r.title.clone(), r.score))
            .collect();
        prop_assert_eq!(actual, fixture.expected(position, n));

        for pair in found.results.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        let titles: HashSet<&str> = found.results.iter().map(|r| r.title.as_str()).collect();
        prop_assert_eq!(titles.len(), found.results.len());
    }

    #[test]
    fn case_and_padding_do_not_change_results(
        fixture in fixture(),
        pick in any::<prop::sample::Index>(),
        n in 1usize..10,
    ) {
        let recommender = fixture.recommender();
        let title = &fixture.titles[pick.index(fixture.titles.len())];
        let shouted = format!("  {}\t", title.to_uppercase());
        prop_assert_eq!(recommender.lookup(title, n), recommender.lookup(&shouted, n));
    }

    #[test]
    fn whitespace_queries_match_nothing(
        fixture in fixture(),
        query in "[ \t\n]{0,6}",
    ) {
        let recommender = fixture.recommender();
        prop_assert!(recommender.recommend(&query, 5).is_empty());
    }

    #[test]
    fn authors_are_never_blank(fixture in fixture(), pick in any::<prop::sample::Index>()) {
        let recommender = fixture.recommender();
        let title = &fixture.titles[pick.index(fixture.titles.len())];
        for result in recommender.recommend(title, 20) {
            prop_assert!(!result.author.is_empty());
            prop_assert!(
                result.author == UNKNOWN_AUTHOR || result.author.starts_with("author of ")
            );
        }
    }
}
