use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use screenshot_assembler::catalog::EpisodeCode;
use screenshot_assembler::transcode::{TranscodeError, Transcoder};
use screenshot_assembler::{AssembleConfig, AssembleError, assemble};

/// The fixtures below never contain webp files, so any call is a test bug.
struct NoWebp;

impl Transcoder for NoWebp {
    fn webp_to_jpg(&self, src: &Path, _dst: &Path) -> Result<(), TranscodeError> {
        panic!("unexpected webp fixture: {}", src.display());
    }
}

struct Fixture {
    _tmp: tempfile::TempDir,
    screenshots: PathBuf,
    titles: PathBuf,
    site: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let screenshots = tmp.path().join("screenshots");
        let titles = tmp.path().join("titles");
        let site = tmp.path().join("site");
        fs::create_dir_all(&screenshots).expect("mkdir screenshots");
        fs::create_dir_all(&titles).expect("mkdir titles");
        Self {
            _tmp: tmp,
            screenshots,
            titles,
            site,
        }
    }

    fn config(&self) -> AssembleConfig {
        AssembleConfig::new(&self.screenshots, &self.titles, &self.site)
    }

    fn episode_folder(&self, code: &str) -> PathBuf {
        let folder = self.screenshots.join(code);
        fs::create_dir_all(&folder).expect("mkdir episode");
        folder
    }

    fn output_file(&self, name: &str) -> PathBuf {
        self.site.join("randomframes").join(name)
    }
}

fn letterboxed_png(path: &Path, width: u32, height: u32, bar: u32) {
    let img = RgbImage::from_fn(width, height, |x, _| {
        if x < bar || x >= width - bar {
            Rgb([0, 0, 0])
        } else {
            Rgb([180, 120, 60])
        }
    });
    img.save(path).expect("save fixture");
}

fn plain_png(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([120, 130, 140]))
        .save(path)
        .expect("save fixture");
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read json")).expect("parse json")
}

#[test]
fn partial_translation_still_publishes_image_manifests() {
    let fx = Fixture::new();
    letterboxed_png(&fx.episode_folder("S01E01P1").join("a.png"), 64, 36, 4);
    letterboxed_png(&fx.episode_folder("S01E01P1").join("b.png"), 64, 36, 4);
    letterboxed_png(&fx.episode_folder("S01E02P1").join("c.png"), 64, 36, 4);
    fs::write(fx.titles.join("English.txt"), "S01E01P1: One\nS01E02P1: Two\n").expect("titles");
    fs::write(fx.titles.join("German.txt"), "S01E01P1: Eins\n").expect("titles");

    let report = assemble(&fx.config(), &NoWebp).expect("pipeline");

    // German is incomplete: reported, and the title manifest is withheld.
    assert!(!report.titles_written);
    assert_eq!(
        report.missing_titles["German"],
        vec![EpisodeCode::new("S01E02P1")]
    );
    assert!(!fx.site.join("episode-titles.json").exists());

    // The image manifests still go out, with the right counts.
    let image_list = read_json(&fx.site.join("image-list.json"));
    assert_eq!(image_list["S01E01P1"], serde_json::json!(["a.png", "b.png"]));
    assert_eq!(image_list["S01E02P1"], serde_json::json!(["c.png"]));

    let seasons = read_json(&fx.site.join("season-keys.json"));
    assert_eq!(
        seasons,
        serde_json::json!({ "S01": ["S01E01P1", "S01E02P1"] })
    );

    // Borders were cropped on the way through.
    assert_eq!(
        image::image_dimensions(fx.output_file("a.png")).expect("dims"),
        (56, 36)
    );

    // Round trip: output files == manifest entries, traceable via origins.
    let mut output: Vec<String> = fs::read_dir(fx.site.join("randomframes"))
        .expect("read output")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    output.sort();
    assert_eq!(output, vec!["a.png", "b.png", "c.png"]);
    for (name, origin) in &report.origins {
        assert!(report.manifest[origin].contains(name));
    }
}

#[test]
fn complete_titles_publish_the_title_manifest() {
    let fx = Fixture::new();
    letterboxed_png(&fx.episode_folder("S01E01P1").join("a.png"), 32, 18, 2);
    fs::write(fx.titles.join("English.txt"), "S01E01P1: One\n").expect("titles");
    fs::write(fx.titles.join("German.txt"), "S01E01P1: Eins\n").expect("titles");

    let report = assemble(&fx.config(), &NoWebp).expect("pipeline");

    assert!(report.titles_written);
    let titles = read_json(&fx.site.join("episode-titles.json"));
    assert_eq!(titles["English"]["S01E01P1"], "S01E01P1: One");
    assert_eq!(titles["German"]["S01E01P1"], "S01E01P1: Eins");
    assert_eq!(titles["German-English"]["S01E01P1"], "S01E01P1: Eins (One)");
}

#[test]
fn missing_folder_aborts_before_image_manifests() {
    let fx = Fixture::new();
    letterboxed_png(&fx.episode_folder("S01E01P1").join("a.png"), 32, 18, 2);
    fs::write(
        fx.titles.join("English.txt"),
        "S01E01P1: One\nS01E99P9: Lost\n",
    )
    .expect("titles");

    let err = assemble(&fx.config(), &NoWebp).expect_err("must abort");
    match err {
        AssembleError::MissingFolders(codes) => {
            assert_eq!(codes, vec![EpisodeCode::new("S01E99P9")]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!fx.site.join("image-list.json").exists());
    assert!(!fx.site.join("season-keys.json").exists());
}

#[test]
fn corrupt_image_is_reported_not_fatal() {
    let fx = Fixture::new();
    let folder = fx.episode_folder("S01E01P1");
    letterboxed_png(&folder.join("good.png"), 32, 18, 2);
    fs::write(folder.join("bad.jpg"), b"not an image").expect("corrupt fixture");
    fs::write(fx.titles.join("English.txt"), "S01E01P1: One\n").expect("titles");

    let report = assemble(&fx.config(), &NoWebp).expect("batch must survive");

    assert_eq!(report.file_failures.len(), 1);
    assert_eq!(report.file_failures[0].filename, "bad.jpg");
    assert_eq!(
        report.file_failures[0].episode,
        EpisodeCode::new("S01E01P1")
    );
    assert!(fx.output_file("good.png").exists());
    assert!(!fx.output_file("bad.jpg").exists());
}

#[test]
fn second_run_skips_processed_and_removes_orphans() {
    let fx = Fixture::new();
    let folder = fx.episode_folder("S01E01P1");
    letterboxed_png(&folder.join("a.png"), 32, 18, 2);
    letterboxed_png(&folder.join("b.png"), 32, 18, 2);
    fs::write(fx.titles.join("English.txt"), "S01E01P1: One\n").expect("titles");

    let config = fx.config();
    let first = assemble(&config, &NoWebp).expect("first run");
    assert_eq!(first.processed, 2);
    assert_eq!(first.skipped, 0);

    // A file nothing in the sources backs must not survive the next run.
    fs::write(fx.output_file("stray.png"), b"left behind").expect("stray");

    let second = assemble(&config, &NoWebp).expect("second run");
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.removed, vec!["stray.png".to_string()]);
    assert!(!fx.output_file("stray.png").exists());
}

#[test]
fn outliers_recropped_to_average_dimensions() {
    let fx = Fixture::new();
    let folder = fx.episode_folder("S01E01P1");
    plain_png(&folder.join("a.png"), 100, 50);
    plain_png(&folder.join("b.png"), 100, 50);
    plain_png(&folder.join("wide.png"), 140, 50);
    fs::write(fx.titles.join("English.txt"), "S01E01P1: One\n").expect("titles");

    let report = assemble(&fx.config(), &NoWebp).expect("pipeline");

    // Average width is 113; only the 140px frame strays past the tolerance.
    assert_eq!(report.resized, vec!["wide.png".to_string()]);
    assert_eq!(
        image::image_dimensions(fx.output_file("wide.png")).expect("dims"),
        (113, 50)
    );
    assert_eq!(
        image::image_dimensions(fx.output_file("a.png")).expect("dims"),
        (100, 50)
    );
}

#[test]
fn normalization_can_be_disabled() {
    let fx = Fixture::new();
    let folder = fx.episode_folder("S01E01P1");
    plain_png(&folder.join("a.png"), 100, 50);
    plain_png(&folder.join("wide.png"), 180, 50);
    fs::write(fx.titles.join("English.txt"), "S01E01P1: One\n").expect("titles");

    let mut config = fx.config();
    config.normalize_dimensions = false;
    let report = assemble(&config, &NoWebp).expect("pipeline");

    assert!(report.resized.is_empty());
    assert_eq!(
        image::image_dimensions(fx.output_file("wide.png")).expect("dims"),
        (180, 50)
    );
}

#[test]
fn duplicate_filenames_across_episodes_are_flagged() {
    let fx = Fixture::new();
    letterboxed_png(&fx.episode_folder("S01E01P1").join("same.png"), 32, 18, 2);
    letterboxed_png(&fx.episode_folder("S01E02P1").join("same.png"), 32, 18, 2);
    fs::write(fx.titles.join("English.txt"), "S01E01P1: One\nS01E02P1: Two\n").expect("titles");

    let report = assemble(&fx.config(), &NoWebp).expect("pipeline");

    assert_eq!(report.collisions.len(), 1);
    assert_eq!(report.collisions[0].filename, "same.png");
    assert_eq!(report.collisions[0].first, EpisodeCode::new("S01E01P1"));
    assert_eq!(report.collisions[0].second, EpisodeCode::new("S01E02P1"));
    // The reverse lookup points at the last writer.
    assert_eq!(report.origins["same.png"], EpisodeCode::new("S01E02P1"));
}
