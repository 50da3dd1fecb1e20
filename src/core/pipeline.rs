use crate::adapters::barcode::Code128;
use crate::adapters::photos::{embed_photo, PhotoIndex};
use crate::adapters::renderer::{merge_sides, RenderContext, Renderer, BARCODE_KEY, PHOTO_KEY};
use crate::adapters::roster::RosterReader;
use crate::adapters::storage::{card_file_stem, FileStems, TMP_DIR};
use crate::adapters::template::CardTemplates;
use crate::core::{
    BatchReport, CardEntry, ConfigProvider, MatchWarning, MatchWarningKind, PhotoMatch,
    PhotoStatus, Pipeline, RenderedCard, Roster, Side, Storage, StudentRecord, TransformResult,
};
use crate::utils::error::Result;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Inputs loaded once per batch.
#[derive(Debug, Clone)]
pub struct BatchInputs {
    pub templates: CardTemplates,
    pub photos: PhotoIndex,
}

struct PhotoOutcome {
    uri: Option<String>,
    status: PhotoStatus,
    warning: Option<MatchWarningKind>,
}

/// Roster in, one front/back/merged card set per student out.
pub struct CardPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> CardPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn match_photo(
        &self,
        inputs: &BatchInputs,
        roster: &Roster,
        record: &StudentRecord,
        key: &str,
    ) -> PhotoOutcome {
        let warn = |kind| PhotoOutcome {
            uri: None,
            status: PhotoStatus::Missing,
            warning: Some(kind),
        };

        let value = roster.photo_value(record);
        if value.is_empty() {
            return warn(MatchWarningKind::EmptyPhotoValue);
        }

        let group = roster.group_value(record);
        match inputs.photos.lookup(value, group) {
            PhotoMatch::Found(asset) => match embed_photo(&asset) {
                Ok(uri) => {
                    tracing::debug!("Card '{}': photo {}", key, asset.path.display());
                    PhotoOutcome {
                        uri: Some(uri),
                        status: PhotoStatus::Embedded { path: asset.path },
                        warning: None,
                    }
                }
                Err(e) => warn(MatchWarningKind::Unreadable {
                    path: asset.path,
                    reason: e.to_string(),
                }),
            },
            PhotoMatch::NotFound => warn(MatchWarningKind::NotFound {
                lookup: value.to_string(),
            }),
            PhotoMatch::Ambiguous(candidates) => warn(MatchWarningKind::Ambiguous {
                lookup: value.to_string(),
                candidates,
            }),
        }
    }
}

impl<S: Storage, C: ConfigProvider> Pipeline for CardPipeline<S, C> {
    type Prepared = BatchInputs;

    fn prepare(&self) -> Result<BatchInputs> {
        let card = self.config.card();
        let templates = CardTemplates::load(self.config.template_dir(), &card.templates)?;
        self.storage.ensure_ready()?;

        let photos = PhotoIndex::scan(self.config.images_dir());
        if photos.is_empty() {
            tracing::warn!(
                "No photos found under {}",
                self.config.images_dir().display()
            );
        }

        Ok(BatchInputs { templates, photos })
    }

    fn extract(&self) -> Result<Roster> {
        tracing::debug!("Reading roster {}", self.config.data_path().display());
        RosterReader::new(&self.config.card().roster).read_path(self.config.data_path())
    }

    fn transform(&self, inputs: &BatchInputs, roster: Roster) -> Result<TransformResult> {
        let card = self.config.card();
        let renderer = Renderer::new(&card.render, &card.fields);
        renderer.check(&inputs.templates, &roster.headers)?;

        let wants_photo = inputs.templates.uses(PHOTO_KEY);
        let wants_barcode = inputs.templates.uses(BARCODE_KEY);
        if !wants_photo {
            tracing::debug!("Templates have no {{{{photo}}}} placeholder");
        }

        let mut result = TransformResult::default();
        let mut stems = FileStems::new();

        for record in &roster.records {
            let key = roster.key(record);
            let mut warn = |kind: MatchWarningKind| {
                let warning = MatchWarning {
                    card: key.to_string(),
                    row: record.row(),
                    kind,
                };
                tracing::warn!("{}", warning);
                result.warnings.push(warning);
            };

            let photo = self.match_photo(inputs, &roster, record, key);
            if let Some(kind) = photo.warning {
                warn(kind);
            }

            if photo.uri.is_none() && card.roster.skip_without_photo {
                tracing::info!("Student '{}' does not have a photo. Skipping...", key);
                result.skipped.push(key.to_string());
                continue;
            }

            let file_stem = stems.claim(key, record.row());
            if key.is_empty() {
                warn(MatchWarningKind::EmptyKey {
                    file: file_stem.clone(),
                });
            } else if file_stem != card_file_stem(key) {
                warn(MatchWarningKind::Renamed {
                    file: file_stem.clone(),
                });
            }

            let barcode_uri = if wants_barcode {
                let value = roster.barcode_value(record);
                match Code128::encode(value) {
                    Ok(code) => Some(code.to_data_uri(&card.render.barcode)),
                    Err(e) => {
                        warn(MatchWarningKind::BarcodeUnavailable {
                            value: value.to_string(),
                            reason: e.to_string(),
                        });
                        None
                    }
                }
            } else {
                None
            };

            let ctx = RenderContext {
                key,
                photo_uri: photo.uri,
                barcode_uri,
            };
            let front = renderer.render(&inputs.templates.front, record, &ctx)?;
            let back = renderer.render(&inputs.templates.back, record, &ctx)?;
            tracing::debug!("Card '{}' front:\n{}", key, front);
            tracing::debug!("Card '{}' back:\n{}", key, back);

            result.cards.push(RenderedCard {
                key: key.to_string(),
                file_stem,
                front,
                back,
                photo: photo.status,
            });
        }

        Ok(result)
    }

    fn load(&self, result: TransformResult) -> Result<BatchReport> {
        let render = &self.config.card().render;
        let mut cards = Vec::with_capacity(result.cards.len());

        for card in result.cards {
            let [front, back] = Side::ALL.map(|side| {
                format!("{}/{}-{}.svg", TMP_DIR, card.file_stem, side.as_str())
            });
            self.storage.write_file(&front, card.side(Side::Front).as_bytes())?;
            self.storage.write_file(&back, card.side(Side::Back).as_bytes())?;

            let file = format!("{}.svg", card.file_stem);
            let merged = merge_sides(&card.front, &card.back, render);
            self.storage.write_file(&file, merged.as_bytes())?;
            tracing::debug!("Wrote {}", self.storage.resolve(&file).display());

            cards.push(CardEntry {
                key: card.key,
                file,
                front,
                back,
                photo: card.photo,
            });
        }

        let report = BatchReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            output_dir: self.config.output_dir().to_path_buf(),
            cards,
            skipped: result.skipped,
            warnings: result.warnings,
        };

        let manifest = serde_json::to_string_pretty(&report)?;
        self.storage.write_file(MANIFEST_FILE, manifest.as_bytes())?;

        Ok(report)
    }
}
