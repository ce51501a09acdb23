//! finhub embed - Exercise the embedding backend
//!
//! Debugging aid: embeds text with the configured (or overridden) backend and
//! reports vector statistics, optionally comparing against a second text.

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::error::Result;
use crate::search::{build_embedder, cosine_similarity};

#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Text to embed
    pub text: String,

    /// Override embedding backend (hash, api)
    #[arg(long, short)]
    pub backend: Option<String>,

    /// Include the full embedding vector
    #[arg(long)]
    pub full: bool,

    /// Compare with another text (cosine similarity)
    #[arg(long, short)]
    pub compare: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingReport {
    status: &'static str,
    backend: String,
    dimensions: usize,
    input: String,
    stats: VectorStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison: Option<Comparison>,
}

#[derive(Debug, Serialize, PartialEq)]
struct VectorStats {
    min: f32,
    max: f32,
    mean: f32,
    l2_norm: f32,
    non_zero_count: usize,
}

#[derive(Debug, Serialize)]
struct Comparison {
    text_b: String,
    cosine_similarity: f32,
}

pub fn run(ctx: &AppContext, args: &EmbedArgs) -> Result<()> {
    let mut config = ctx.config.embedding.clone();
    if let Some(backend) = &args.backend {
        config.backend.clone_from(backend);
    }

    let embedder = build_embedder(&config)?;
    let embedding = embedder.embed(&args.text)?;

    let comparison = match &args.compare {
        Some(text_b) => {
            let other = embedder.embed(text_b)?;
            Some(Comparison {
                text_b: text_b.clone(),
                cosine_similarity: cosine_similarity(&embedding, &other),
            })
        }
        None => None,
    };

    let report = EmbeddingReport {
        status: "ok",
        backend: embedder.name().to_string(),
        dimensions: embedder.dims(),
        input: args.text.clone(),
        stats: vector_stats(&embedding),
        embedding: args.full.then_some(embedding),
        comparison,
    };

    if ctx.robot_mode {
        output::emit_json(&report)
    } else {
        output::emit_human(render_human(&report));
        Ok(())
    }
}

fn vector_stats(embedding: &[f32]) -> VectorStats {
    if embedding.is_empty() {
        return VectorStats {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            l2_norm: 0.0,
            non_zero_count: 0,
        };
    }
    let (min, max, sum) = embedding
        .iter()
        .fold((f32::MAX, f32::MIN, 0.0f32), |acc, &x| {
            (acc.0.min(x), acc.1.max(x), acc.2 + x)
        });
    VectorStats {
        min,
        max,
        mean: sum / embedding.len() as f32,
        l2_norm: embedding.iter().map(|x| x * x).sum::<f32>().sqrt(),
        non_zero_count: embedding.iter().filter(|x| x.abs() > 1e-10).count(),
    }
}

fn render_human(report: &EmbeddingReport) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.section("Embedding");
    layout.kv("Backend", &report.backend.cyan().to_string());
    layout.kv("Dimensions", &report.dimensions.to_string());
    layout.kv("Input", &format!("\"{}\"", report.input.green()));
    layout.blank();

    layout.section("Stats");
    layout.kv("Min", &format!("{:.6}", report.stats.min));
    layout.kv("Max", &format!("{:.6}", report.stats.max));
    layout.kv("Mean", &format!("{:.6}", report.stats.mean));
    layout.kv("L2 norm", &format!("{:.6}", report.stats.l2_norm));
    layout.kv("Non-zero", &report.stats.non_zero_count.to_string());

    if let Some(embedding) = &report.embedding {
        layout.blank();
        layout.section("Full vector");
        for chunk in embedding.chunks(8) {
            let row: Vec<String> = chunk.iter().map(|v| format!("{v:8.5}")).collect();
            layout.push_line(row.join(" "));
        }
    }

    if let Some(comparison) = &report.comparison {
        let similarity = comparison.cosine_similarity;
        let rendered = format!("{similarity:.4}");
        let colored = if similarity > 0.8 {
            rendered.green()
        } else if similarity > 0.5 {
            rendered.yellow()
        } else {
            rendered.red()
        };
        layout.blank();
        layout.section("Similarity");
        layout.kv("Text B", &format!("\"{}\"", comparison.text_b));
        layout.kv("Cosine", &colored.to_string());
    }
    layout
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_args_parses() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            args: EmbedArgs,
        }

        let cli = TestCli::parse_from(["test", "interest rate", "--compare", "yield"]);
        assert_eq!(cli.args.text, "interest rate");
        assert_eq!(cli.args.compare.as_deref(), Some("yield"));
        assert!(cli.args.backend.is_none());
        assert!(!cli.args.full);
    }

    #[test]
    fn stats_of_empty_vector_are_zero() {
        let stats = vector_stats(&[]);
        assert_eq!(stats.non_zero_count, 0);
        assert_eq!(stats.l2_norm, 0.0);
    }

    #[test]
    fn stats_summarize_values() {
        let stats = vector_stats(&[3.0, 0.0, -4.0]);
        assert_eq!(stats.min, -4.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.l2_norm - 5.0).abs() < 1e-6);
        assert_eq!(stats.non_zero_count, 2);
    }
}
