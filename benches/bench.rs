// Criterion benchmarks for Campus Match

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use campus_match::core::{extract_json, parse_ranking, Matcher, QueryTerms};
use campus_match::models::{Candidate, CandidateKind, Event, Host, MatchQuery};

const VIBES: &[&str] = &[
    "Quiet space, early bedtime (11 PM).",
    "Loud, frequent guests, night owl.",
    "Tidy and calm, peaceful evenings",
    "Social, music most nights, late night snacks",
];

const INTERESTS: &[&str] = &[
    "Quiet study, loves coffee, early riser.",
    "Late-night gaming, heavy sleeper, social.",
    "Hiking, photography and board games",
    "Jazz, cooking, debate club",
];

fn create_host(id: usize) -> Candidate {
    Candidate::Host(Host {
        id: id as i64,
        name: format!("Host {}", id),
        interests: INTERESTS[id % INTERESTS.len()].to_string(),
        dorm_vibe: VIBES[id % VIBES.len()].to_string(),
        available_dates: vec!["2025-11-08".to_string()],
        capacity: 1 + (id % 3) as u32,
    })
}

fn create_event(id: usize) -> Candidate {
    Candidate::Event(Event {
        id: id as i64,
        title: format!("Campus Event {}: AI & Music Night", id),
        description: "An evening of talks, live music and free snacks at Frist.".to_string(),
        date: format!("2025-11-{:02}", 1 + id % 28),
        time: "19:00".to_string(),
        location: "Frist Campus Center".to_string(),
        category: if id % 2 == 0 { "arts" } else { "academic" }.to_string(),
        cost: if id % 3 == 0 { 0.0 } else { 5.0 },
        tags: vec!["music".to_string(), "ai".to_string(), "open mic".to_string()],
    })
}

fn bench_query_parsing(c: &mut Criterion) {
    c.bench_function("query_terms_parse", |b| {
        b.iter(|| QueryTerms::parse(black_box("I need a quiet place, early bedtime and some coffee nearby")));
    });
}

fn bench_keyword_scoring(c: &mut Criterion) {
    let matcher = Matcher::with_defaults();
    let host_query = MatchQuery::hosts("I need a quiet place, early bedtime", "2025-11-08");
    let event_query = MatchQuery::events("free ai talks and open mic music");

    let mut group = c.benchmark_group("keyword_scoring");

    for pool_size in [10, 100, 1000].iter() {
        let hosts: Vec<Candidate> = (0..*pool_size).map(create_host).collect();
        let events: Vec<Candidate> = (0..*pool_size).map(create_event).collect();

        group.bench_with_input(BenchmarkId::new("hosts", pool_size), pool_size, |b, _| {
            b.iter(|| matcher.score_pool(black_box(&host_query), black_box(&hosts)));
        });

        group.bench_with_input(BenchmarkId::new("events", pool_size), pool_size, |b, _| {
            b.iter(|| matcher.score_pool(black_box(&event_query), black_box(&events)));
        });
    }

    group.finish();
}

fn bench_extraction(c: &mut Criterion) {
    let pool: Vec<Candidate> = (0..50).map(create_host).collect();
    let entries: Vec<String> = (0..50)
        .map(|i| {
            format!(
                r#"{{"host_id": {}, "name": "Host {}", "compatibility_score": 0.{}, "reasoning": "Shares {{quiet}} habits"}}"#,
                i,
                i,
                i % 10
            )
        })
        .collect();
    let payload = format!(r#"{{"ranked_matches": [{}]}}"#, entries.join(", "));

    let fenced = format!("Here is the ranking:\n```json\n{}\n```", payload);
    let prose = format!("Sure! Based on the profiles, {} Let me know if you need more.", payload);

    let mut group = c.benchmark_group("extraction");

    group.bench_function("fenced", |b| b.iter(|| extract_json(black_box(&fenced))));
    group.bench_function("balanced", |b| b.iter(|| extract_json(black_box(&prose))));
    group.bench_function("parse_ranking_50_hosts", |b| {
        b.iter(|| parse_ranking(black_box(&fenced), CandidateKind::Host, black_box(&pool)))
    });

    group.finish();
}

criterion_group!(benches, bench_query_parsing, bench_keyword_scoring, bench_extraction);

criterion_main!(benches);
