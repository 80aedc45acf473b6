//! Triage a few complaints from the command line and print the records as JSON.
//!
//! Usage: `triage_demo [--area AREA] [--age N] [TEXT...]`. Without TEXT a built-in
//! sample set is used. Settings come from the same `TRIAGE_*` variables as the service.

use anyhow::{anyhow, Context, Result};
use civic_triage::{Complaint, EligibilityMetadata, InMemoryCounts, Settings, TriageEngine};

const SAMPLES: &[(&str, &str)] = &[
    ("Ward 5", "No water supply for 6 days, elderly residents suffering"),
    ("Ward 5", "Water tanker has not come, entire area affected"),
    ("Ward 12", "Huge pothole on the main road caused an accident"),
    ("Ward 3", "Garbage not collected for 2 weeks near the school, children falling sick"),
    ("", "My old age pension has not been credited"),
];

fn main() -> Result<()> {
    civic_triage::telemetry::init_tracing();

    let mut area: Option<String> = None;
    let mut age: Option<u32> = None;
    let mut words = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(a) = args.next() {
        match a.as_str() {
            "--area" => area = Some(args.next().ok_or_else(|| anyhow!("--area needs a value"))?),
            "--age" => {
                let raw = args.next().ok_or_else(|| anyhow!("--age needs a value"))?;
                age = Some(raw.parse().with_context(|| format!("bad --age `{raw}`"))?);
            }
            _ => words.push(a),
        }
    }

    let (engine, report) = TriageEngine::bootstrap(&Settings::from_env());
    eprintln!("{}", serde_json::to_string(&report)?);

    let meta = age.map(|a| EligibilityMetadata {
        age: Some(a),
        income_group: None,
    });
    let counts = InMemoryCounts::default();

    let complaints: Vec<Complaint> = if words.is_empty() {
        SAMPLES
            .iter()
            .map(|(a, t)| Complaint {
                text: (*t).to_string(),
                area: Some((*a).to_string()).filter(|a| !a.is_empty()),
                status: None,
            })
            .collect()
    } else {
        vec![Complaint {
            text: words.join(" "),
            area,
            status: None,
        }]
    };

    for c in &complaints {
        let rec = engine.analyze(c, meta.as_ref(), &counts);
        if let Some(a) = c.area.as_deref() {
            counts.record(a, &rec.category);
        }
        println!("{}", serde_json::to_string_pretty(&rec)?);
    }
    Ok(())
}
