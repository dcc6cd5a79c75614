//! TrafoXML, the XML layout for transformation descriptions.
//!
//! ```xml
//! <TrafoXML version="1.0">
//!   <Transformation name="linear">
//!     <Param type="float" name="slope" value="1.02"/>
//!     <Param type="float" name="intercept" value="-3.5"/>
//!     <Pairs count="2">
//!       <Pair from="10.0" to="6.7"/>
//!       <Pair from="100.0" to="98.5"/>
//!     </Pairs>
//!   </Transformation>
//! </TrafoXML>
//! ```
//!
//! Only the model name, its parameters and the pairs are stored. Loading
//! rebuilds the model by fitting the named kind to the pairs, except for a
//! linear model that carries explicit `slope` and `intercept` parameters.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::{
    self,
    BufRead,
    Write,
};

use quick_xml::events::{
    BytesDecl,
    BytesEnd,
    BytesStart,
    Event,
};
use quick_xml::{
    Reader,
    Writer,
};

use crate::description::TransformationDescription;
use crate::errors::FitError;
use crate::models::{
    BreakPositions,
    CoordinatePair,
    Extrapolation,
    InterpolationType,
    LinearModel,
    ModelKind,
    ModelParams,
    TransformationModel,
};

pub(crate) const TRAFO_XML_VERSION: &str = "1.0";

#[derive(Debug)]
pub(crate) enum TrafoXmlError {
    Malformed(String),
    Fit(FitError),
}

impl Display for TrafoXmlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "{}", msg),
            Self::Fit(e) => write!(f, "{}", e),
        }
    }
}

impl From<quick_xml::Error> for TrafoXmlError {
    fn from(x: quick_xml::Error) -> Self {
        Self::Malformed(x.to_string())
    }
}

fn param_type(value: &str) -> &'static str {
    if value.parse::<i64>().is_ok() {
        "int"
    } else if value.parse::<f64>().is_ok() {
        "float"
    } else {
        "string"
    }
}

pub(crate) fn write_trafo_xml<W: Write>(
    writer: W,
    trafo: &TransformationDescription,
) -> io::Result<()> {
    let mut xml = Writer::new_with_indent(writer, b' ', 2);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(io::Error::other)?;

    let mut root = BytesStart::new("TrafoXML");
    root.push_attribute(("version", TRAFO_XML_VERSION));
    xml.write_event(Event::Start(root))
        .map_err(io::Error::other)?;

    let mut elem = BytesStart::new("Transformation");
    if let Some(model) = trafo.model() {
        elem.push_attribute(("name", model.kind().as_str()));
    }
    xml.write_event(Event::Start(elem))
        .map_err(io::Error::other)?;

    if let Some(model) = trafo.model() {
        for (name, value) in model.param_entries() {
            let mut param = BytesStart::new("Param");
            param.push_attribute(("type", param_type(&value)));
            param.push_attribute(("name", name));
            param.push_attribute(("value", value.as_str()));
            xml.write_event(Event::Empty(param))
                .map_err(io::Error::other)?;
        }
    }

    let count = trafo.samples().len().to_string();
    let mut pairs = BytesStart::new("Pairs");
    pairs.push_attribute(("count", count.as_str()));
    xml.write_event(Event::Start(pairs))
        .map_err(io::Error::other)?;
    for p in trafo.samples() {
        let from = p.observed.to_string();
        let to = p.reference.to_string();
        let mut pair = BytesStart::new("Pair");
        pair.push_attribute(("from", from.as_str()));
        pair.push_attribute(("to", to.as_str()));
        xml.write_event(Event::Empty(pair))
            .map_err(io::Error::other)?;
    }
    xml.write_event(Event::End(BytesEnd::new("Pairs")))
        .map_err(io::Error::other)?;

    xml.write_event(Event::End(BytesEnd::new("Transformation")))
        .map_err(io::Error::other)?;
    xml.write_event(Event::End(BytesEnd::new("TrafoXML")))
        .map_err(io::Error::other)?;
    xml.into_inner().flush()
}

fn get_attribute(e: &BytesStart, name: &str) -> Result<Option<String>, TrafoXmlError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| TrafoXmlError::Malformed(e.to_string()))?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn required_attribute(e: &BytesStart, name: &str) -> Result<String, TrafoXmlError> {
    get_attribute(e, name)?.ok_or_else(|| {
        TrafoXmlError::Malformed(format!(
            "<{}> is missing the '{}' attribute",
            String::from_utf8_lossy(e.name().as_ref()),
            name
        ))
    })
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, TrafoXmlError> {
    value.trim().parse::<T>().map_err(|_| {
        TrafoXmlError::Malformed(format!("invalid value '{}' for '{}'", value, name))
    })
}

pub(crate) fn read_trafo_xml<R: BufRead>(
    reader: R,
) -> Result<TransformationDescription, TrafoXmlError> {
    let mut reader = Reader::from_reader(reader);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut seen_root = false;
    let mut model_name: Option<String> = None;
    let mut params: BTreeMap<String, String> = BTreeMap::new();
    let mut samples: Vec<CoordinatePair> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                b"TrafoXML" => seen_root = true,
                b"Transformation" => model_name = get_attribute(e, "name")?,
                b"Param" => {
                    let name = required_attribute(e, "name")?;
                    let value = required_attribute(e, "value")?;
                    params.insert(name, value);
                }
                b"Pair" => {
                    let from = parse_number("from", &required_attribute(e, "from")?)?;
                    let to = parse_number("to", &required_attribute(e, "to")?)?;
                    samples.push(CoordinatePair::new(from, to));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(TrafoXmlError::Malformed(
            "missing <TrafoXML> root element".to_string(),
        ));
    }

    let description = TransformationDescription::new(samples);
    let Some(name) = model_name else {
        return Ok(description);
    };
    let kind = ModelKind::from_name(&name)
        .ok_or_else(|| TrafoXmlError::Malformed(format!("unknown model '{}'", name)))?;
    let model = build_model(kind, &params, description.samples())?;
    Ok(description.with_model(model))
}

fn build_model(
    kind: ModelKind,
    params: &BTreeMap<String, String>,
    samples: &[CoordinatePair],
) -> Result<TransformationModel, TrafoXmlError> {
    let model_params = model_params(params)?;
    if kind == ModelKind::Linear {
        if let (Some(slope), Some(intercept)) = (params.get("slope"), params.get("intercept")) {
            let mut linear = LinearModel::new(
                parse_number("slope", slope)?,
                parse_number("intercept", intercept)?,
            );
            linear.params = model_params.linear;
            return Ok(TransformationModel::Linear(linear));
        }
    }
    TransformationModel::fit(kind, samples, &model_params).map_err(TrafoXmlError::Fit)
}

fn model_params(params: &BTreeMap<String, String>) -> Result<ModelParams, TrafoXmlError> {
    fn named<T>(
        key: &str,
        value: &str,
        from_name: fn(&str) -> Option<T>,
    ) -> Result<T, TrafoXmlError> {
        from_name(value).ok_or_else(|| {
            TrafoXmlError::Malformed(format!("invalid value '{}' for '{}'", value, key))
        })
    }

    let mut out = ModelParams::default();
    for (key, value) in params {
        match key.as_str() {
            "symmetric_regression" => {
                out.linear.symmetric_regression = parse_number(key, value)?;
            }
            "num_breakpoints" => out.b_spline.num_breakpoints = parse_number(key, value)?,
            "smoothing" => out.b_spline.smoothing = parse_number(key, value)?,
            "break_positions" => {
                out.b_spline.break_positions = named(key, value, BreakPositions::from_name)?;
            }
            "extrapolate" => {
                out.b_spline.extrapolate = named(key, value, Extrapolation::from_name)?;
            }
            "interpolation_type" => {
                out.interpolated.interpolation_type =
                    named(key, value, InterpolationType::from_name)?;
            }
            "extrapolation_type" => {
                out.interpolated.extrapolation_type = named(key, value, Extrapolation::from_name)?;
            }
            // slope and intercept are read by the linear model directly
            _ => {}
        }
    }
    Ok(out)
}
