use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::dedup::{DUPLICATES_THRESHOLD, DistractorSource, deduplicate_distractors};
use crate::llm::{
    DistractorSet, GENERATION_TEMPERATURE, GenerationError, OpenAiDistractorSource, ensure_client,
};
use crate::output::{DistractorEntry, write_distractors};
use crate::palette::Palette;
use crate::utils::{pluralize, pluralize_with};
use crate::wordlist::{WordPair, read_word_pairs};

pub struct GenerateOptions {
    pub count: usize,
    pub deduplicate_trials: usize,
}

pub async fn run(input: &Path, output: &Path, options: &GenerateOptions) -> Result<()> {
    let pairs = read_word_pairs(input)?;

    if pairs.is_empty() {
        println!(
            "{}",
            Palette::dim(format!("No word pairs found in {}", input.display()))
        );
        write_distractors(output, &BTreeMap::new())?;
        return Ok(());
    }

    // Zero distractors requested: every word still gets an entry,
    // and no client is built and no remote call is made.
    if options.count == 0 {
        let entries = empty_entries(&pairs);
        write_distractors(output, &entries)?;
        print_summary(output, entries.len(), pairs.len(), &[]);
        return Ok(());
    }

    let client = ensure_client(&format!(
        "\n{} will send {} from {} to the OpenAI API.",
        Palette::paint(Palette::INFO, "distractors"),
        pluralize_with("word pair", pairs.len(), |n| Palette::paint(
            Palette::WARNING,
            n
        )),
        input.display()
    ))?;
    let source = OpenAiDistractorSource::new(&client);

    run_with_source(&source, &pairs, output, options).await
}

pub async fn run_with_source<S: DistractorSource>(
    source: &S,
    pairs: &[WordPair],
    output: &Path,
    options: &GenerateOptions,
) -> Result<()> {
    let bar = ProgressBar::new(pairs.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?,
    );

    let mut entries = BTreeMap::new();
    let mut durations = Vec::with_capacity(pairs.len());

    for pair in pairs {
        let started = Instant::now();
        match generate_for_pair(source, pair, options).await {
            Ok(set) => {
                entries.insert(pair.word.clone(), DistractorEntry::from(set));
            }
            Err(err) => {
                bar.println(Palette::paint(
                    Palette::WARNING,
                    format!("Skipping \"{}\": {}", pair.word, err),
                ));
            }
        }
        durations.push(started.elapsed().as_secs_f64());
        bar.inc(1);
    }
    bar.finish_and_clear();

    write_distractors(output, &entries)?;
    print_summary(output, entries.len(), pairs.len(), &durations);
    Ok(())
}

async fn generate_for_pair<S: DistractorSource>(
    source: &S,
    pair: &WordPair,
    options: &GenerateOptions,
) -> Result<DistractorSet, GenerationError> {
    let mut set = source
        .generate(pair, options.count, GENERATION_TEMPERATURE)
        .await?;
    deduplicate_distractors(
        source,
        &mut set,
        options.count,
        options.deduplicate_trials,
        DUPLICATES_THRESHOLD,
    )
    .await;
    Ok(set)
}

fn empty_entries(pairs: &[WordPair]) -> BTreeMap<String, DistractorEntry> {
    pairs
        .iter()
        .map(|pair| {
            (
                pair.word.clone(),
                DistractorEntry {
                    theme: String::new(),
                    distractors: Vec::new(),
                },
            )
        })
        .collect()
}

fn print_summary(output: &Path, generated: usize, total: usize, durations: &[f64]) {
    if !durations.is_empty() {
        let (mean, std) = mean_std(durations);
        println!(
            "{} {:.3} ± {:.3} sec per word",
            Palette::dim("Generation time:"),
            mean,
            std
        );
    }
    if generated < total {
        println!(
            "{}",
            Palette::paint(
                Palette::WARNING,
                pluralize_with("word", total - generated, |n| n.to_string()) + " skipped",
            )
        );
    }
    println!(
        "Saved {} to {}",
        pluralize("distractor set", generated),
        Palette::paint(Palette::SUCCESS, output.display())
    );
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationError;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::fs;
    use tempfile::tempdir;

    fn pair(word: &str, translation: &str) -> WordPair {
        WordPair {
            word: word.to_string(),
            translation: translation.to_string(),
            source_language: "en".to_string(),
            target_language: "ru".to_string(),
        }
    }

    struct FakeSource {
        responses: RefCell<VecDeque<Result<Vec<String>, GenerationError>>>,
    }

    impl FakeSource {
        fn scripted(responses: Vec<Result<Vec<String>, GenerationError>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
            }
        }
    }

    impl DistractorSource for FakeSource {
        async fn generate(
            &self,
            pair: &WordPair,
            _count: usize,
            _temperature: f32,
        ) -> Result<DistractorSet, GenerationError> {
            match self.responses.borrow_mut().pop_front() {
                Some(Ok(distractors)) => Ok(DistractorSet {
                    pair: pair.clone(),
                    theme: "scripted".to_string(),
                    distractors,
                }),
                Some(Err(err)) => Err(err),
                None => Err(GenerationError::MalformedResponse(
                    "script exhausted".to_string(),
                )),
            }
        }
    }

    #[test]
    fn mean_std_of_constant_series() {
        let (mean, std) = mean_std(&[2.0, 2.0, 2.0]);
        assert_eq!(mean, 2.0);
        assert_eq!(std, 0.0);

        let (mean, std) = mean_std(&[]);
        assert_eq!(mean, 0.0);
        assert_eq!(std, 0.0);
    }

    #[test]
    fn empty_entries_cover_every_word() {
        let pairs = vec![pair("apple", "яблоко"), pair("lake", "озеро")];
        let entries = empty_entries(&pairs);

        assert_eq!(entries.len(), 2);
        for entry in entries.values() {
            assert!(entry.theme.is_empty());
            assert!(entry.distractors.is_empty());
        }
    }

    // `run` returns before a client is ever constructed, so this passes
    // with no API key and no network.
    #[tokio::test]
    async fn zero_count_round_trip_makes_no_calls() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("words.csv");
        let output = dir.path().join("distractors.json");
        fs::write(
            &input,
            "word,translation,source_language,target_language\n\
             apple,яблоко,en,ru\n\
             lake,озеро,en,ru\n",
        )
        .unwrap();

        let options = GenerateOptions {
            count: 0,
            deduplicate_trials: 1,
        };
        run(&input, &output, &options).await.unwrap();

        let read_back: BTreeMap<String, DistractorEntry> =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(read_back.len(), 2);
        assert!(read_back["apple"].distractors.is_empty());
        assert!(read_back["lake"].distractors.is_empty());
    }

    #[tokio::test]
    async fn failed_word_is_skipped_and_the_run_continues() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("distractors.json");
        let pairs = vec![pair("apple", "яблоко"), pair("lake", "озеро")];
        let options = GenerateOptions {
            count: 2,
            deduplicate_trials: 1,
        };

        let source = FakeSource::scripted(vec![
            Err(GenerationError::MalformedResponse("bad json".to_string())),
            Ok(vec!["пруд".to_string(), "река".to_string()]),
        ]);

        run_with_source(&source, &pairs, &output, &options)
            .await
            .unwrap();

        let read_back: BTreeMap<String, DistractorEntry> =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back["lake"].distractors, vec!["пруд", "река"]);
        assert_eq!(read_back["lake"].theme, "scripted");
    }

    #[tokio::test]
    async fn end_to_end_distractors_are_distinct_and_never_the_translation() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("distractors.json");
        let pairs = vec![pair("apple", "яблоко")];
        let options = GenerateOptions {
            count: 3,
            deduplicate_trials: 1,
        };

        // The model echoes the translation and a near-duplicate; one regen fixes it
        let source = FakeSource::scripted(vec![
            Ok(vec![
                "груша".to_string(),
                "яблоко".to_string(),
                "слива".to_string(),
                "спелая груша".to_string(),
            ]),
            Ok(vec!["вишня".to_string()]),
        ]);

        run_with_source(&source, &pairs, &output, &options)
            .await
            .unwrap();

        let read_back: BTreeMap<String, DistractorEntry> =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        let entry = &read_back["apple"];
        assert_eq!(entry.distractors.len(), 3);
        assert!(!entry.distractors.contains(&"яблоко".to_string()));
        assert_eq!(entry.distractors, vec!["груша", "слива", "вишня"]);
    }
}
