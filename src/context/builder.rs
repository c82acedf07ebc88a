//! Assembles the ordered, sectioned context document for one tree.

use super::reflection::{reflect, WeatherReflection};
use crate::analysis::TrendThresholds;
use crate::api::WeatherSource;
use crate::error::{AppError, Result};
use crate::models::{
    ContextDocument, ContextSection, LocationRecord, PollutantRecord, SectionKind, SpeciesRecord,
    TreeRecord,
};
use crate::narrative::{format_number, generate_impact_sentence};
use chrono::{Local, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Builds context documents, fetching weather through `W`.
pub struct ContextBuilder<W> {
    source: W,
    thresholds: TrendThresholds,
    seed: Option<u64>,
    today: Option<NaiveDate>,
}

/// Sections that only depend on the static records.
struct TableSections {
    tree: ContextSection,
    species: Option<ContextSection>,
    ecology: Option<ContextSection>,
    location: Option<ContextSection>,
    history: Option<ContextSection>,
}

impl<W: WeatherSource> ContextBuilder<W> {
    pub fn new(source: W) -> Self {
        Self {
            source,
            thresholds: TrendThresholds::default(),
            seed: None,
            today: None,
        }
    }

    pub fn with_thresholds(mut self, thresholds: TrendThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Fixes the seed of the per-build random generator used to pick impact rows.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Pins the reference date of the weather windows (defaults to the local date).
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn source(&self) -> &W {
        &self.source
    }

    pub fn thresholds(&self) -> &TrendThresholds {
        &self.thresholds
    }

    /// The reference date used for the weather windows.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// A fresh generator for one build: seeded when configured, from entropy otherwise.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Runs the weather reflection for `tree`, if it has coordinates.
    pub async fn weather_reflection(&self, tree: &TreeRecord) -> Option<WeatherReflection> {
        let (latitude, longitude) = tree.coordinates.pair()?;
        reflect(&self.source, latitude, longitude, self.today(), &self.thresholds).await
    }

    /// Builds the document. The weather reflection runs concurrently with the table-driven
    /// sections and is awaited when the health section is appended.
    ///
    /// Fails only when the tree has no usable name at all.
    pub async fn build_context(
        &self,
        tree: &TreeRecord,
        species: Option<&SpeciesRecord>,
        locations: &[LocationRecord],
        pollutants: &[PollutantRecord],
    ) -> Result<ContextDocument> {
        let name = tree
            .display_name()
            .ok_or_else(|| AppError::MissingTreeIdentity(tree.id.clone()))?;
        info!("Building context for tree {} ({})", tree.id, name);

        let mut rng = self.rng();
        let (reflection, tables) = tokio::join!(self.weather_reflection(tree), async {
            table_sections(tree, name, species, locations, pollutants, &mut rng)
        });

        let document = assemble(tree, tables, reflection.as_ref());
        debug!(
            "Context for tree {} has {} sections",
            tree.id,
            document.sections.len()
        );
        Ok(document)
    }
}

/// Builds a document from already-available inputs, without touching the network.
pub fn build_offline<R>(
    tree: &TreeRecord,
    species: Option<&SpeciesRecord>,
    locations: &[LocationRecord],
    pollutants: &[PollutantRecord],
    reflection: Option<&WeatherReflection>,
    rng: &mut R,
) -> Result<ContextDocument>
where
    R: Rng + ?Sized,
{
    let name = tree
        .display_name()
        .ok_or_else(|| AppError::MissingTreeIdentity(tree.id.clone()))?;
    let tables = table_sections(tree, name, species, locations, pollutants, rng);
    Ok(assemble(tree, tables, reflection))
}

fn assemble(
    tree: &TreeRecord,
    tables: TableSections,
    reflection: Option<&WeatherReflection>,
) -> ContextDocument {
    let sections = [
        Some(tables.tree),
        tables.species,
        tables.ecology,
        tables.location,
        health_section(tree, reflection),
        tables.history,
    ]
    .into_iter()
    .flatten()
    .collect();

    ContextDocument {
        tree_id: tree.id.clone(),
        sections,
    }
}

fn table_sections<R>(
    tree: &TreeRecord,
    name: &str,
    species: Option<&SpeciesRecord>,
    locations: &[LocationRecord],
    pollutants: &[PollutantRecord],
    rng: &mut R,
) -> TableSections
where
    R: Rng + ?Sized,
{
    TableSections {
        tree: tree_section(tree, name),
        species: species.and_then(species_section),
        ecology: species.and_then(|s| ecology_section(s, pollutants, rng)),
        location: location_section(tree, locations),
        history: history_section(tree),
    }
}

/// Collects `label: value` lines, skipping absent or blank values.
#[derive(Default)]
struct Lines(Vec<String>);

impl Lines {
    fn push(&mut self, label: &str, value: Option<impl AsRef<str>>) {
        if let Some(value) = value {
            let value = value.as_ref().trim();
            if !value.is_empty() {
                self.0.push(format!("{}: {}", label, value));
            }
        }
    }

    fn push_number(&mut self, label: &str, value: Option<f64>, unit: &str) {
        if let Some(value) = value.filter(|v| v.is_finite()) {
            self.0.push(format!("{}: {} {}", label, format_number(value, 2), unit));
        }
    }

    fn push_text(&mut self, value: Option<&str>) {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.0.push(value.to_string());
        }
    }

    fn into_body(self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.join("\n"))
        }
    }
}

fn tree_section(tree: &TreeRecord, name: &str) -> ContextSection {
    let mut lines = Lines::default();
    lines.push("Nome", Some(name));
    lines.push("Nome scientifico", tree.scientific_name.as_deref());
    lines.push("Nome comune", tree.common_name.as_deref());
    lines.push_number("Altezza", tree.height_m, "m");
    lines.push_number("Circonferenza del tronco", tree.circumference_cm, "cm");
    lines.push_number("Diametro della chioma", tree.crown_diameter_m, "m");

    let place: Vec<&str> = [&tree.municipality, &tree.province, &tree.region]
        .into_iter()
        .filter_map(|p| p.as_deref().map(str::trim).filter(|p| !p.is_empty()))
        .collect();
    if !place.is_empty() {
        lines.push("Posizione", Some(place.join(", ")));
    }
    if let Some((latitude, longitude)) = tree.coordinates.pair() {
        lines.push("Coordinate", Some(format!("{:.5}, {:.5}", latitude, longitude)));
    }
    lines.push("Criteri di monumentalità", tree.monumental_criteria.as_deref());

    ContextSection::new(SectionKind::Tree, &lines.into_body().unwrap_or_default())
        .with_tags(&["albero", "identità", "dimensioni"])
        .with_metadata("tree_id", tree.id.clone())
}

fn species_section(species: &SpeciesRecord) -> Option<ContextSection> {
    let mut lines = Lines::default();
    lines.push("Specie", species.scientific_name.as_deref());
    lines.push("Nome comune", species.common_name.as_deref());
    lines.push("Famiglia", species.family.as_deref());
    lines.push("Portamento", species.leaf_habit.as_deref());
    lines.push("Fioritura", species.flowering_period.as_deref());
    lines.push_number("Altezza massima", species.max_height_m, "m");
    lines.push("Longevità", species.longevity.as_deref());
    lines.push_text(species.description.as_deref());

    let body = lines.into_body()?;
    Some(ContextSection::new(SectionKind::Species, &body).with_tags(&["specie", "botanica"]))
}

/// One paragraph per abatement value whose impact sentence renders.
///
/// Omitted when the species has no abatement values or no table row renders for any of them.
fn ecology_section<R>(
    species: &SpeciesRecord,
    pollutants: &[PollutantRecord],
    rng: &mut R,
) -> Option<ContextSection>
where
    R: Rng + ?Sized,
{
    let mut codes = Vec::new();
    let mut paragraphs = Vec::new();
    for (code, quantity) in species.abatement.present() {
        match generate_impact_sentence(code, quantity, pollutants, rng) {
            Some(sentence) => {
                codes.push(code);
                paragraphs.push(sentence.text);
            },
            None => debug!("No impact sentence rendered for {}", code),
        }
    }

    if paragraphs.is_empty() {
        return None;
    }

    Some(
        ContextSection::new(SectionKind::Ecology, &paragraphs.join("\n\n"))
            .with_tags(&["ecologia", "inquinamento"])
            .with_metadata("pollutants", codes),
    )
}

fn location_section(tree: &TreeRecord, locations: &[LocationRecord]) -> Option<ContextSection> {
    let municipality = tree.municipality.as_deref()?.trim().to_lowercase();
    let place = locations
        .iter()
        .find(|l| l.municipality.trim().to_lowercase() == municipality)?;

    let mut lines = Lines::default();
    lines.push("Comune", Some(place.municipality.trim()));
    lines.push("Provincia", place.province.as_deref());
    lines.push("Regione", place.region.as_deref());
    if let Some(population) = place.population {
        lines.push("Popolazione", Some(format!("{} abitanti", population)));
    }
    lines.push_number("Superficie", place.area_km2, "km²");
    lines.push_number("Altitudine", place.altitude_m, "m s.l.m.");
    lines.push_text(place.history.as_deref());
    lines.push_text(place.culture.as_deref());

    let body = lines.into_body()?;
    Some(
        ContextSection::new(SectionKind::Location, &body)
            .with_tags(&["luogo", "comune"])
            .with_metadata("municipality", place.municipality.clone()),
    )
}

fn health_section(tree: &TreeRecord, reflection: Option<&WeatherReflection>) -> Option<ContextSection> {
    let mut lines = Lines::default();
    lines.push("Stato di salute", tree.health_status.as_deref());
    if let Some(reflection) = reflection {
        lines.push_text(Some("Come ho vissuto il tempo di questi giorni:"));
        lines.push_text(Some(reflection.text.as_str()));
    }

    let body = lines.into_body()?;
    let mut section = ContextSection::new(SectionKind::Health, &body).with_tags(&["salute", "meteo"]);
    if let Some(reflection) = reflection {
        if let Some(score) = reflection.week.air_quality_score {
            section = section.with_metadata("air_quality_score", score);
        }
        if let Some(end) = reflection.week.period_end {
            section = section.with_metadata("period_end", end.to_string());
        }
        section = section.with_metadata("trend_count", reflection.trends.len());
    }
    Some(section)
}

fn history_section(tree: &TreeRecord) -> Option<ContextSection> {
    let mut lines = Lines::default();
    lines.push("Età", tree.age.as_deref());
    lines.push_text(tree.historical_notes.as_deref());

    let body = lines.into_body()?;
    Some(ContextSection::new(SectionKind::History, &body).with_tags(&["storia", "età"]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockWeatherProvider;
    use crate::models::{AbatementValues, Coordinates, Quantity};

    fn tree() -> TreeRecord {
        TreeRecord {
            id: "LOM-042".to_string(),
            nickname: Some("Il Cedro di Villa Reale".to_string()),
            scientific_name: Some("Cedrus libani".to_string()),
            height_m: Some(28.5),
            circumference_cm: Some(610.0),
            municipality: Some("MONZA".to_string()),
            region: Some("Lombardia".to_string()),
            age: Some("circa 200 anni".to_string()),
            ..Default::default()
        }
    }

    fn species(abatement: AbatementValues) -> SpeciesRecord {
        SpeciesRecord {
            scientific_name: Some("Cedrus libani".to_string()),
            family: Some("Pinaceae".to_string()),
            abatement,
            ..Default::default()
        }
    }

    fn pollutants() -> Vec<PollutantRecord> {
        vec![
            PollutantRecord {
                pollutant_code: "CO2".to_string(),
                reference_value: "10 kg".to_string(),
                dependency_quantity: "5 giorni".to_string(),
                time_span: "anno".to_string(),
                description_template:
                    "Ogni {$tempo} assorbo {$valore} di CO₂, quanto {$dipendenza} di riscaldamento domestico."
                        .to_string(),
                ..Default::default()
            },
            PollutantRecord {
                pollutant_code: "PM10".to_string(),
                reference_value: "1 kg".to_string(),
                dependency_quantity: "100 km".to_string(),
                time_span: "anno".to_string(),
                description_template: "Trattengo {$valore} di polveri, come {$dipendenza} in auto."
                    .to_string(),
                ..Default::default()
            },
        ]
    }

    fn locations() -> Vec<LocationRecord> {
        vec![LocationRecord {
            municipality: "Monza".to_string(),
            province: Some("Monza e Brianza".to_string()),
            population: Some(123_000),
            history: Some("Antica capitale longobarda.".to_string()),
            ..Default::default()
        }]
    }

    fn build(
        tree: &TreeRecord,
        species: Option<&SpeciesRecord>,
        reflection: Option<&WeatherReflection>,
    ) -> Result<ContextDocument> {
        let mut rng = StdRng::seed_from_u64(1);
        build_offline(tree, species, &locations(), &pollutants(), reflection, &mut rng)
    }

    #[test]
    fn test_ecology_omitted_without_abatements() {
        let doc = build(&tree(), Some(&species(AbatementValues::default())), None).unwrap();
        assert!(doc.section(SectionKind::Species).is_some());
        assert!(doc.section(SectionKind::Ecology).is_none());
        assert!(!doc.to_text().contains("DATI ECOLOGICI:"));
    }

    #[test]
    fn test_one_paragraph_per_abatement() {
        let abatement = AbatementValues {
            co2: Some(Quantity::new(20.0, "kg")),
            pm10: Some(Quantity::new(0.5, "kg")),
            so2: Some(Quantity::new(0.1, "kg")),
            ..Default::default()
        };
        let doc = build(&tree(), Some(&species(abatement)), None).unwrap();
        let ecology = doc.section(SectionKind::Ecology).unwrap();

        let body = ecology.content.trim_start_matches("DATI ECOLOGICI:\n");
        let paragraphs: Vec<&str> = body.split("\n\n").collect();
        assert_eq!(paragraphs.len(), 2);
        assert!(paragraphs[0].contains("10 giorni"));
        assert!(paragraphs[1].contains("50 km"));
        assert!(!ecology.content.contains("SO₂"));
        assert_eq!(ecology.metadata["pollutants"], serde_json::json!(["CO₂", "PM10"]));
    }

    #[test]
    fn test_ecology_omitted_when_no_row_renders() {
        let abatement = AbatementValues {
            co2: Some(Quantity::new(20.0, "kg")),
            ..Default::default()
        };
        let cedar = species(abatement);
        let mut rng = StdRng::seed_from_u64(1);
        let doc = build_offline(&tree(), Some(&cedar), &locations(), &[], None, &mut rng).unwrap();
        assert!(doc.section(SectionKind::Ecology).is_none());

        let only_so2 = AbatementValues {
            so2: Some(Quantity::new(0.1, "kg")),
            ..Default::default()
        };
        let doc = build(&tree(), Some(&species(only_so2)), None).unwrap();
        assert!(doc.section(SectionKind::Ecology).is_none());
        assert!(!doc.to_text().contains("DATI ECOLOGICI:"));
    }

    #[test]
    fn test_location_matched_case_insensitively() {
        let doc = build(&tree(), None, None).unwrap();
        let location = doc.section(SectionKind::Location).unwrap();
        assert!(location.content.starts_with("DATI LUOGO:\n"));
        assert!(location.content.contains("Comune: Monza"));
        assert!(location.content.contains("123000 abitanti"));
    }

    #[test]
    fn test_unmatched_location_is_omitted() {
        let mut t = tree();
        t.municipality = Some("Monzambano".to_string());
        let doc = build(&t, None, None).unwrap();
        assert!(doc.section(SectionKind::Location).is_none());
    }

    #[test]
    fn test_missing_identity_is_fatal() {
        let anonymous = TreeRecord {
            id: "X-1".to_string(),
            nickname: Some(" ".to_string()),
            ..Default::default()
        };
        match build(&anonymous, None, None) {
            Err(AppError::MissingTreeIdentity(id)) => assert_eq!(id, "X-1"),
            other => panic!("Expected MissingTreeIdentity, got {:?}", other),
        }
    }

    #[test]
    fn test_sections_in_fixed_order_and_absent_ones_omitted() {
        let mut t = tree();
        t.health_status = Some("Buono".to_string());
        let doc = build(&t, None, None).unwrap();
        let kinds: Vec<SectionKind> = doc.sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Tree,
                SectionKind::Location,
                SectionKind::Health,
                SectionKind::History
            ]
        );
        let text = doc.to_text();
        assert!(text.starts_with("DATI ALBERO:\nNome: Il Cedro di Villa Reale"));
        assert!(text.contains("Altezza: 28.5 m"));
        assert!(text.contains("DATI STORICI:\nEtà: circa 200 anni"));
    }

    #[tokio::test]
    async fn test_build_context_embeds_weather_reflection() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        let builder = ContextBuilder::new(MockWeatherProvider::new(9, today))
            .with_seed(4)
            .with_today(today);
        let mut t = tree();
        t.coordinates = Coordinates::new(45.58, 9.27);

        let doc = builder
            .build_context(&t, Some(&species(AbatementValues::default())), &locations(), &pollutants())
            .await
            .unwrap();
        let health = doc.section(SectionKind::Health).unwrap();
        assert!(health.content.contains("Nell'ultimo anno"));
        assert!(health.metadata.contains_key("air_quality_score"));
        assert_eq!(health.metadata["period_end"], "2024-07-14");
    }

    #[tokio::test]
    async fn test_build_context_without_coordinates_skips_weather() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        let builder = ContextBuilder::new(MockWeatherProvider::new(9, today)).with_today(today);
        let doc = builder
            .build_context(&tree(), None, &[], &[])
            .await
            .unwrap();
        assert!(doc.section(SectionKind::Health).is_none());
        assert!(doc.section(SectionKind::Location).is_none());
    }
}
