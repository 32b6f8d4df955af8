use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use review_insight::aggregate::finalize::{finalize, SortOrder};
use review_insight::aggregate::RunningAggregate;
use review_insight::config::Config;
use review_insight::pipeline::{self, GenresInput};
use review_insight::sample::SamplingPolicy;
use review_insight::source::{clean_window, CsvOptions, FieldSpec, RecordSource, Window};

const TITLE: &str = "Title";
const SCORE: &str = "review/score";

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

/// Deterministic reviews file with repeated titles, gaps and quoted text.
fn synthetic_reviews(rows: usize) -> String {
    let titles = ["Dune", "Emma", "Beloved", "Ulysses", "War, and Peace", "Middlemarch"];
    let texts = [
        "A wonderful and moving novel",
        "Terrible, boring and far too long",
        "Great characters and a great plot",
        "The cover is blue",
        "Not good at all, a poor ending",
    ];

    let mut out = String::from("Id,Title,review/score,review/time,review/text\n");
    for i in 0..rows {
        let title = titles[(i * 7 + i / 3) % titles.len()];
        let score = if i % 11 == 5 {
            String::new()
        } else {
            format!("{}.{}", 1 + (i * 13) % 5, (i * 3) % 10)
        };
        let time = 946_684_800 + (i as i64) * 86_400 * 3;
        let text = texts[(i * 5 + 1) % texts.len()];
        writeln!(out, "{i},\"{title}\",{score},{time},\"{text}\"").expect("format row");
    }
    out
}

fn fold_file(path: &Path, window_size: usize) -> RunningAggregate<String> {
    let source = RecordSource::open(
        path,
        &[FieldSpec::text(TITLE), FieldSpec::float(SCORE)],
        window_size,
        &CsvOptions::default(),
    )
    .expect("open");

    let mut agg = RunningAggregate::new();
    for window in source {
        let cleaned = clean_window(window.expect("window"), &[TITLE, SCORE]).expect("clean");
        agg.fold(&cleaned.window, TITLE, SCORE).expect("fold");
    }
    agg
}

#[test]
fn end_to_end_two_titles_across_windows() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write(dir.path(), "reviews.csv", "Title,review/score\nA,5\nA,3\nB,4\n");

    let windows: Vec<Window> = RecordSource::open(
        &input,
        &[FieldSpec::text(TITLE), FieldSpec::float(SCORE)],
        2,
        &CsvOptions::default(),
    )
    .expect("open")
    .collect::<Result<_, _>>()
    .expect("read");
    assert_eq!(windows.iter().map(Window::len).collect::<Vec<_>>(), vec![2, 1]);

    let mut cfg = Config::default();
    cfg.titles.chunk_size = 2;
    let output = dir.path().join("titles.csv");
    let report = pipeline::run_titles(&cfg, &input, &output, None).expect("run");

    assert_eq!(report.scan.windows, 2);
    assert_eq!(
        fs::read_to_string(&output).expect("read"),
        "key,total_count,average\nA,2,4.0\nB,1,4.0\n"
    );
}

#[test]
fn titles_output_is_independent_of_window_size() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write(dir.path(), "reviews.csv", &synthetic_reviews(600));

    let mut outputs = Vec::new();
    for size in [1, 2, 10, 1_000, 600] {
        let mut cfg = Config::default();
        cfg.titles.chunk_size = size;
        let output = dir.path().join(format!("titles-{size}.csv"));
        pipeline::run_titles(&cfg, &input, &output, None).expect("run");
        outputs.push(fs::read_to_string(&output).expect("read"));
    }

    assert!(outputs[0].lines().count() > 1);
    for out in &outputs[1..] {
        assert_eq!(out, &outputs[0]);
    }
}

#[test]
fn merged_partials_match_single_pass() {
    let dir = tempfile::tempdir().expect("temp dir");
    let all = synthetic_reviews(400);
    let mut lines = all.lines();
    let header = lines.next().expect("header");
    let body: Vec<&str> = lines.collect();
    let (left, right) = body.split_at(173);

    let whole_path = write(dir.path(), "all.csv", &all);
    let left_path = write(dir.path(), "left.csv", &format!("{header}\n{}\n", left.join("\n")));
    let right_path = write(dir.path(), "right.csv", &format!("{header}\n{}\n", right.join("\n")));

    let whole = fold_file(&whole_path, 64);
    let mut merged = fold_file(&left_path, 17);
    merged.merge(fold_file(&right_path, 5));

    assert_eq!(merged.len(), whole.len());
    assert_eq!(merged.total_count(), whole.total_count());
    for (key, entry) in whole.iter() {
        let m = merged.get(key).expect("key present in merge");
        assert_eq!(m.count, entry.count, "{key}");
        assert!((m.sum - entry.sum).abs() <= 1e-9 * entry.sum.abs().max(1.0), "{key}");
    }

    let finalized = finalize(whole, SortOrder::CountDesc);
    assert_eq!(finalized.omitted_zero_count, 0);
    assert!(finalized.rows.iter().all(|r| r.average.is_finite()));
}

#[test]
fn malformed_rows_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write(
        dir.path(),
        "reviews.csv",
        "Title,review/score\nA,5\nA,3,extra\nB\nB,4\nC,abc\n",
    );
    let output = dir.path().join("titles.csv");

    let report = pipeline::run_titles(&Config::default(), &input, &output, None).expect("run");
    assert_eq!(report.scan.records, 5);
    assert_eq!(report.scan.malformed, 2);
    assert_eq!(report.scan.dropped, 3);
    assert_eq!(
        fs::read_to_string(&output).expect("read"),
        "key,total_count,average\nA,1,5.0\nB,1,4.0\n"
    );
}

#[test]
fn missing_dataset_aborts_without_output() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("timeline.csv");

    let err = pipeline::run_timeline(&Config::default(), &dir.path().join("nope.csv"), &output)
        .unwrap_err();
    assert!(format!("{err:#}").contains("dataset not found"));
    assert!(!output.exists());
}

#[test]
fn empty_dataset_writes_header_only() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write(dir.path(), "reviews.csv", "Title,review/score,review/time\n");
    let output = dir.path().join("timeline.csv");

    let report = pipeline::run_timeline(&Config::default(), &input, &output).expect("run");
    assert_eq!(report.rows_written, 0);
    assert_eq!(report.first_bucket, None);
    assert_eq!(
        fs::read_to_string(&output).expect("read"),
        "time_bucket,total_count,average\n"
    );
}

#[test]
fn sentiment_is_reproducible_for_a_seed() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write(dir.path(), "reviews.csv", &synthetic_reviews(300));

    for policy in [SamplingPolicy::BoundedFill, SamplingPolicy::Reservoir] {
        let mut cfg = Config::default();
        cfg.sentiment.chunk_size = 64;
        cfg.sentiment.sample_size = 50;
        cfg.sentiment.policy = policy;

        let first = dir.path().join(format!("{}-a", policy.as_str()));
        let second = dir.path().join(format!("{}-b", policy.as_str()));
        let a = pipeline::run_sentiment(&cfg, &input, &first).expect("run");
        let b = pipeline::run_sentiment(&cfg, &input, &second).expect("run");

        assert_eq!(a, b);
        assert_eq!(a.sampled, 50);
        assert_eq!(a.polarity.total(), 50);
        for file in [
            pipeline::sentiment::POSITIVE_WORDS_FILE,
            pipeline::sentiment::NEGATIVE_WORDS_FILE,
            pipeline::sentiment::SUMMARY_FILE,
        ] {
            assert_eq!(
                fs::read_to_string(first.join(file)).expect("read"),
                fs::read_to_string(second.join(file)).expect("read"),
                "{file}"
            );
        }
    }
}

#[test]
fn genres_from_titles_table_match_genres_from_reviews() {
    let dir = tempfile::tempdir().expect("temp dir");
    let reviews = write(dir.path(), "reviews.csv", &synthetic_reviews(500));
    let metadata = write(
        dir.path(),
        "books.csv",
        "Title,categories\n\
         Dune,['Fiction']\n\
         Emma,\"['Fiction', 'Classics']\"\n\
         Beloved,['Fiction']\n\
         Ulysses,['Classics']\n\
         \"War, and Peace\",['Classics']\n\
         Middlemarch,[]\n",
    );

    let mut cfg = Config::default();
    cfg.genres.min_members = 1;

    let titles = dir.path().join("titles.csv");
    pipeline::run_titles(&cfg, &reviews, &titles, None).expect("titles");

    let from_reviews = dir.path().join("genres-reviews.csv");
    let from_titles = dir.path().join("genres-titles.csv");
    let a = pipeline::run_genres(&cfg, GenresInput::Reviews(&reviews), &metadata, &from_reviews)
        .expect("genres");
    let b = pipeline::run_genres(&cfg, GenresInput::Titles(&titles), &metadata, &from_titles)
        .expect("genres");

    assert_eq!(a.join, b.join);
    assert_eq!(a.join.matched, 5);
    assert_eq!(a.join.uncategorized, 1);

    let parse = |path: &Path| -> Vec<(String, u64, u64, f64)> {
        fs::read_to_string(path)
            .expect("read")
            .lines()
            .skip(1)
            .map(|l| {
                let f: Vec<&str> = l.split(',').collect();
                (
                    f[0].to_string(),
                    f[1].parse().expect("members"),
                    f[2].parse().expect("count"),
                    f[3].parse().expect("average"),
                )
            })
            .collect()
    };
    let ra = parse(&from_reviews);
    let rb = parse(&from_titles);
    assert_eq!(ra.len(), 2);
    assert_eq!(ra.len(), rb.len());
    for (x, y) in ra.iter().zip(&rb) {
        assert_eq!((&x.0, x.1, x.2), (&y.0, y.1, y.2));
        assert!((x.3 - y.3).abs() < 1e-9);
    }
}
