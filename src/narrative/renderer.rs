//! Rule-based rendering of climate windows into an Italian first-person reflection.
//!
//! Every topic owns a table of value bands with strictly decreasing thresholds and a final
//! catch-all band. Bands are checked top-down and the first match wins, so each topic always
//! yields exactly one sentence, `NaN` included (it falls through to the catch-all).

use super::template::format_number;
use crate::analysis::NEUTRAL_AIR_QUALITY_SCORE;
use crate::models::{ClimateWindow, TrendStatement};

/// A sentence used when the topic value is strictly above `above`; `None` matches anything.
#[derive(Debug)]
struct Band {
    above: Option<f64>,
    text: &'static str,
}

const fn band(above: f64, text: &'static str) -> Band {
    Band {
        above: Some(above),
        text,
    }
}

const fn otherwise(text: &'static str) -> Band {
    Band { above: None, text }
}

const TEMPERATURE_BANDS: &[Band] = &[
    band(38.0, "Questa settimana ho sopportato un caldo estremo: la temperatura media è stata di {v}°C, con punte di {max}°C, e le mie foglie hanno faticato a trattenere l'acqua."),
    band(32.0, "È stata una settimana torrida, con una temperatura media di {v}°C e massime fino a {max}°C: ho offerto la mia ombra a chi cercava riparo."),
    band(25.0, "Le giornate sono state calde, con una media di {v}°C: quando l'acqua non manca è il momento in cui cresco di più."),
    band(10.0, "Il clima è stato mite, con una temperatura media di {v}°C, tra una minima di {min}°C e una massima di {max}°C."),
    band(0.0, "Ha fatto freddo, con una media di {v}°C: la mia linfa scorre lenta e aspetto giorni più tiepidi."),
    otherwise("Il gelo si è fatto sentire, con una media di {v}°C e minime fino a {min}°C: riposo immobile in attesa della primavera."),
];

/// Smallest rain total printed for a week with any rain at all.
const MIN_SHOWN_RAIN_MM: f64 = 0.01;

const PRECIPITATION_BANDS: &[Band] = &[
    band(100.0, "Sono caduti ben {v} mm di pioggia: il terreno intorno alle mie radici è saturo d'acqua."),
    band(50.0, "È piovuto molto, {v} mm in sette giorni: le mie radici hanno fatto ampie scorte."),
    band(20.0, "Una pioggia generosa, {v} mm in tutto, ha ristorato il terreno."),
    band(5.0, "Qualche pioggia leggera, {v} mm in tutto, ha bagnato appena il suolo."),
    band(0.0, "Sono cadute solo poche gocce, {v} mm in tutta la settimana."),
    otherwise("Non è caduta nemmeno una goccia di pioggia: il terreno intorno a me è asciutto."),
];

const HUMIDITY_BANDS: &[Band] = &[
    band(85.0, "L'aria è stata molto umida, con un'umidità media del {v}%: nebbie e rugiada hanno avvolto la mia chioma."),
    band(70.0, "L'umidità è stata alta, in media del {v}%, e le mie foglie ne hanno beneficiato."),
    band(50.0, "L'umidità è stata equilibrata, in media del {v}%."),
    band(40.0, "L'aria è stata piuttosto asciutta, con un'umidità media del {v}%."),
    otherwise("L'umidità è stata bassa, appena il {v}% in media: l'aria secca mi fa perdere acqua dalle foglie."),
];

const WIND_BANDS: &[Band] = &[
    band(50.0, "Il vento ha soffiato con violenza, in media {v} km/h con raffiche fino a {max} km/h: i miei rami più vecchi hanno tremato."),
    band(30.0, "È stata una settimana ventosa, con una media di {v} km/h e raffiche fino a {max} km/h."),
    band(15.0, "Una brezza costante, in media {v} km/h, ha mosso le mie fronde."),
    band(5.0, "Un vento leggero, in media {v} km/h, ha accarezzato la mia chioma."),
    otherwise("L'aria è rimasta quasi immobile, con un vento medio di appena {v} km/h."),
];

const PRESSURE_BANDS: &[Band] = &[
    band(1025.0, "La pressione atmosferica è stata alta, in media {v} hPa: segno di tempo stabile."),
    band(1013.0, "La pressione è stata leggermente sopra la norma, in media {v} hPa."),
    band(1000.0, "La pressione è stata nella norma, in media {v} hPa."),
    band(985.0, "La pressione è stata bassa, in media {v} hPa, come spesso accade con il tempo instabile."),
    otherwise("La pressione è stata molto bassa, in media {v} hPa: segno di perturbazioni intense."),
];

const AIR_QUALITY_BANDS: &[Band] = &[
    band(80.0, "L'aria che respiro è stata pulita: il suo indice di qualità è {v} su 100."),
    band(60.0, "La qualità dell'aria è stata buona, con un indice di {v} su 100."),
    band(40.0, "La qualità dell'aria è stata discreta, con un indice di {v} su 100: qualche inquinante in più del solito."),
    band(20.0, "La qualità dell'aria è stata scarsa, con un indice di {v} su 100: le mie foglie hanno filtrato molte polveri."),
    otherwise("La qualità dell'aria è stata pessima, con un indice di appena {v} su 100: ho lavorato duramente per ripulirla."),
];

/// Topics in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Temperature,
    Precipitation,
    Humidity,
    Wind,
    Pressure,
    AirQuality,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::Temperature,
        Topic::Precipitation,
        Topic::Humidity,
        Topic::Wind,
        Topic::Pressure,
        Topic::AirQuality,
    ];

    fn bands(&self) -> &'static [Band] {
        match self {
            Topic::Temperature => TEMPERATURE_BANDS,
            Topic::Precipitation => PRECIPITATION_BANDS,
            Topic::Humidity => HUMIDITY_BANDS,
            Topic::Wind => WIND_BANDS,
            Topic::Pressure => PRESSURE_BANDS,
            Topic::AirQuality => AIR_QUALITY_BANDS,
        }
    }

    /// The value the bands are checked against.
    fn value(&self, week: &ClimateWindow) -> f64 {
        match self {
            Topic::Temperature => week.temperature.mean,
            Topic::Precipitation => week.precipitation,
            Topic::Humidity => week.humidity,
            Topic::Wind => week.wind.mean,
            Topic::Pressure => week.pressure,
            Topic::AirQuality => week.air_quality_score.unwrap_or(NEUTRAL_AIR_QUALITY_SCORE),
        }
    }
}

fn select(bands: &'static [Band], value: f64) -> &'static str {
    bands
        .iter()
        .find(|b| b.above.map_or(true, |threshold| value > threshold))
        .or_else(|| bands.last())
        .map(|b| b.text)
        .unwrap_or_default()
}

/// Renders the single sentence for `topic` from the week window.
pub fn topic_sentence(topic: Topic, week: &ClimateWindow) -> String {
    let value = topic.value(week);
    let text = select(topic.bands(), value);
    let (min, max) = match topic {
        Topic::Temperature => (week.temperature.min, week.temperature.max),
        Topic::Wind => (week.wind.mean, week.wind.max),
        _ => (value, value),
    };
    let shown = match topic {
        Topic::AirQuality => format_number(value, 0),
        // Traces of rain must not print as 0 mm.
        Topic::Precipitation if value > 0.0 => format_number(value.max(MIN_SHOWN_RAIN_MM), 2),
        _ => format_number(value, 1),
    };
    text.replace("{v}", &shown)
        .replace("{min}", &format_number(min, 1))
        .replace("{max}", &format_number(max, 1))
}

pub fn year_summary(year: &ClimateWindow) -> String {
    format!(
        "Nell'ultimo anno la temperatura media è stata di {}°C, tra una minima di {}°C e una massima di {}°C, con {} mm di pioggia complessivi e un'umidità media del {}%.",
        format_number(year.temperature.mean, 1),
        format_number(year.temperature.min, 1),
        format_number(year.temperature.max, 1),
        format_number(year.precipitation, 0),
        format_number(year.humidity, 0)
    )
}

pub fn decade_summary(decade: &ClimateWindow) -> String {
    format!(
        "Negli ultimi dieci anni, in questo periodo dell'anno, la temperatura media è stata di {}°C, con circa {} mm di pioggia al mese.",
        format_number(decade.temperature.mean, 1),
        format_number(decade.precipitation, 0)
    )
}

/// Renders the full reflection, one line per sentence, in the order: temperature,
/// precipitation, humidity, wind, pressure, air quality, trends, year summary, decade summary.
pub fn render(
    week: &ClimateWindow,
    year: Option<&ClimateWindow>,
    decade: Option<&ClimateWindow>,
    trends: &[TrendStatement],
) -> String {
    let mut lines: Vec<String> = Topic::ALL
        .iter()
        .map(|topic| topic_sentence(*topic, week))
        .collect();
    lines.extend(trends.iter().map(|t| t.text.clone()));
    if let Some(year) = year {
        lines.push(year_summary(year));
    }
    if let Some(decade) = decade {
        lines.push(decade_summary(decade));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TrendTopic, WindowKind};
    use rstest::rstest;

    fn week() -> ClimateWindow {
        let mut w = ClimateWindow::empty(WindowKind::Week);
        w.temperature.mean = 18.0;
        w.temperature.min = 9.0;
        w.temperature.max = 24.0;
        w.precipitation = 12.0;
        w.humidity = 60.0;
        w.wind.mean = 8.0;
        w.wind.max = 25.0;
        w.pressure = 1016.0;
        w.air_quality_score = Some(90.0);
        w
    }

    #[test]
    fn test_band_tables_are_ordered_and_exhaustive() {
        for topic in Topic::ALL {
            let bands = topic.bands();
            assert!(bands.len() >= 2, "{:?} needs at least two bands", topic);
            assert!(bands.last().unwrap().above.is_none(), "{:?} lacks a catch-all", topic);
            let thresholds: Vec<f64> = bands.iter().filter_map(|b| b.above).collect();
            assert_eq!(thresholds.len(), bands.len() - 1);
            assert!(
                thresholds.windows(2).all(|w| w[0] > w[1]),
                "{:?} thresholds must decrease",
                topic
            );
        }
    }

    #[test]
    fn test_every_value_selects_one_sentence() {
        let probes = [
            f64::NEG_INFINITY,
            -1e9,
            -40.0,
            -0.0,
            0.0,
            0.5,
            5.0,
            10.0,
            25.0,
            38.0,
            38.01,
            70.0,
            999.0,
            1013.0,
            1e9,
            f64::INFINITY,
            f64::NAN,
        ];
        for topic in Topic::ALL {
            for value in probes {
                let text = select(topic.bands(), value);
                assert!(!text.is_empty(), "{:?} has no sentence for {}", topic, value);
            }
        }
    }

    #[rstest]
    #[case(40.0, "caldo estremo")]
    #[case(38.0, "torrida")]
    #[case(33.0, "torrida")]
    #[case(26.0, "calde")]
    #[case(18.0, "mite")]
    #[case(0.0, "gelo")]
    #[case(f64::NAN, "gelo")]
    fn test_temperature_band_precedence(#[case] mean: f64, #[case] expected: &str) {
        let mut w = week();
        w.temperature.mean = mean;
        assert!(topic_sentence(Topic::Temperature, &w).contains(expected));
    }

    #[test]
    fn test_values_are_interpolated() {
        let mut w = week();
        w.temperature.mean = 40.0;
        w.temperature.max = 43.5;
        let sentence = topic_sentence(Topic::Temperature, &w);
        assert!(sentence.contains("40°C"));
        assert!(sentence.contains("43.5°C"));

        let wind = topic_sentence(Topic::Wind, &w);
        assert!(wind.contains("8 km/h"));
    }

    #[rstest]
    #[case(0.04, "0.04 mm")]
    #[case(0.001, "0.01 mm")]
    #[case(3.456, "3.46 mm")]
    #[case(12.0, "12 mm")]
    fn test_rain_traces_are_not_shown_as_zero(#[case] total: f64, #[case] expected: &str) {
        let mut w = week();
        w.precipitation = total;
        let sentence = topic_sentence(Topic::Precipitation, &w);
        assert!(sentence.contains(expected), "{}", sentence);
        assert!(!sentence.contains(" 0 mm"));
    }

    #[test]
    fn test_dry_week_with_low_humidity() {
        let mut w = week();
        w.precipitation = 0.0;
        w.humidity = 35.0;
        let mut decade = ClimateWindow::empty(WindowKind::Decade);
        decade.humidity = 60.0;

        let text = render(&w, None, Some(&decade), &[]);
        let dry = text
            .find("Non è caduta nemmeno una goccia di pioggia")
            .expect("dry sentence");
        let low_humidity = text.find("L'umidità è stata bassa").expect("humidity sentence");
        assert!(dry < low_humidity);
        assert!(text.contains("35%"));
    }

    #[test]
    fn test_render_order() {
        let trend = TrendStatement {
            topic: TrendTopic::Temperature,
            window_a: WindowKind::Week,
            window_b: WindowKind::Year,
            text: "TREND".to_string(),
        };
        let mut year = ClimateWindow::empty(WindowKind::Year);
        year.precipitation = 800.0;
        let decade = ClimateWindow::empty(WindowKind::Decade);

        let text = render(&week(), Some(&year), Some(&decade), &[trend]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines[0].contains("°C"));
        assert!(lines[1].contains("mm"));
        assert!(lines[2].contains("umidità"));
        assert!(lines[3].contains("km/h"));
        assert!(lines[4].contains("hPa"));
        assert!(lines[5].contains("su 100"));
        assert_eq!(lines[6], "TREND");
        assert!(lines[7].starts_with("Nell'ultimo anno"));
        assert!(lines[7].contains("800 mm"));
        assert!(lines[8].starts_with("Negli ultimi dieci anni"));
    }

    #[test]
    fn test_render_without_history_has_only_topics() {
        let text = render(&week(), None, None, &[]);
        assert_eq!(text.lines().count(), Topic::ALL.len());
    }

    #[test]
    fn test_missing_air_quality_score_uses_neutral_band() {
        let mut w = week();
        w.air_quality_score = None;
        assert!(topic_sentence(Topic::AirQuality, &w).contains("75 su 100"));
    }
}
