//! Property-based test generators using proptest.
//!
//! Values are drawn from small pools so that generated catalogs have
//! shared titles, years, directors and genre tags, which is what makes
//! intersections and duplicate keys interesting.

use cinedex_core::{Query, Record, SortKey, SortOrder};
use proptest::prelude::*;

const TITLE_STEMS: &[&str] = &["Hamlet", "hamlet II", "Ham", "Othello", "Metropolis", "M", "Sunrise"];
const GENRES: &[&str] = &["Drama", "Horror", "Comedy", "Sci-Fi", "Crime"];
const DIRECTORS: &[&str] = &["Fritz Lang", "F. W. Murnau", "fritz lang", "A Director", ""];

/// Strategy for record ids; a narrow range produces duplicate ids.
pub fn id_strategy() -> impl Strategy<Value = String> {
    (0u32..40).prop_map(|n| format!("tt{n}"))
}

/// Strategy for titles, mixing shared stems with random suffixes.
pub fn title_strategy() -> impl Strategy<Value = String> {
    (
        prop::sample::select(TITLE_STEMS),
        prop::string::string_regex("( [A-Za-z]{1,6})?").expect("Invalid regex"),
    )
        .prop_map(|(stem, suffix)| format!("{stem}{suffix}"))
}

/// Strategy for release years.
pub fn year_strategy() -> impl Strategy<Value = i32> {
    1900i32..1940
}

/// Strategy for comma-separated genre lists, with irregular spacing.
pub fn genre_strategy() -> impl Strategy<Value = String> {
    prop::sample::subsequence(GENRES, 0..=3).prop_map(|tags| tags.join(", "))
}

/// Strategy for director names.
pub fn director_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(DIRECTORS).prop_map(str::to_string)
}

/// Strategy for records that fit their field widths.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    (
        id_strategy(),
        title_strategy(),
        year_strategy(),
        genre_strategy(),
        director_strategy(),
    )
        .prop_map(|(id, title, year, genre, director)| {
            Record::new(id, title, year, genre, director)
        })
}

/// Strategy for records with fields of any length, oversized included.
pub fn oversized_record_strategy() -> impl Strategy<Value = Record> {
    (
        "[a-z0-9]{0,16}",
        "[A-Za-zé ]{0,140}",
        any::<i32>(),
        "[A-Za-z, ]{0,30}",
        "[A-Za-zö ]{0,130}",
    )
        .prop_map(|(id, title, year, genre, director)| {
            Record::new(id, title, year, genre, director)
        })
}

/// Strategy for a catalog of `len` records.
pub fn records_strategy(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(record_strategy(), len)
}

/// Strategy for queries drawing on the same pools as [`record_strategy`].
pub fn query_strategy() -> impl Strategy<Value = Query> {
    (
        prop::option::weighted(0.15, id_strategy()),
        prop::option::of(prop_oneof![
            year_strategy().prop_map(|y| (y, y)),
            (year_strategy(), year_strategy()),
        ]),
        prop::option::of(prop_oneof![
            Just(String::new()),
            Just("ham".to_string()),
            Just("HAMLET".to_string()),
            "[a-zA-Z]{1,2}",
        ]),
        prop::option::of(director_strategy()),
        prop::option::of(prop_oneof![
            prop::sample::select(GENRES).prop_map(str::to_string),
            Just("drama".to_string()),
        ]),
        prop_oneof![Just(SortKey::Title), Just(SortKey::Year), Just(SortKey::Director)],
        any::<bool>(),
    )
        .prop_map(|(id, year, title, director, genre, sort, descending)| {
            let mut query = Query::new().sort_by(sort);
            query.order = if descending {
                SortOrder::Descending
            } else {
                SortOrder::Ascending
            };
            query.id = id;
            query.title_prefix = title;
            query.director = director;
            query.genre = genre;
            if let Some((min, max)) = year {
                query = query.year_range(min, max);
            }
            query
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinedex_codec::{encode_record, truncate_utf8, TITLE_WIDTH};

    proptest! {
        #[test]
        fn generated_records_fit_their_widths(record in record_strategy()) {
            prop_assert!(record.same_fields(&record.truncated()));
        }

        #[test]
        fn oversized_records_still_encode(record in oversized_record_strategy()) {
            prop_assert!(encode_record(&record).is_ok());
            let truncated = record.truncated();
            prop_assert_eq!(truncated.title.as_str(), truncate_utf8(&record.title, TITLE_WIDTH));
        }
    }
}
