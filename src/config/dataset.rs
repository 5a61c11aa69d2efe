//! Dataset options: grid convention, archives and tracked fields.

use chrono::NaiveDateTime;

use super::{ConfigError, ParameterSet};
use crate::dataset::{parse_date, FieldRole, FieldSpec, TimeConversion};
use crate::grid::{NemoModel, NemoNames, OceanModel, RegularModel, RegularNames, RomsModel, RomsNames};
use crate::interpolation::{EmptyStencilPolicy, ScalarMethod};
use crate::types::TimeArrow;
use crate::vertical::SCoordinateMode;

/// Names of the time-varying variables in the field archives.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableNames {
    pub time: String,
    pub u: String,
    pub v: String,
    /// Free surface, used for the vertical velocity of moving levels.
    pub zeta: Option<String>,
    pub temperature: Option<String>,
    pub salinity: Option<String>,
    /// Vertical diffusivity.
    pub kv: Option<String>,
}

impl VariableNames {
    pub fn roms() -> Self {
        Self {
            time: "ocean_time".into(),
            u: "u".into(),
            v: "v".into(),
            zeta: Some("zeta".into()),
            temperature: Some("temp".into()),
            salinity: Some("salt".into()),
            kv: Some("AKt".into()),
        }
    }

    pub fn nemo() -> Self {
        Self {
            time: "time_counter".into(),
            u: "vozocrtx".into(),
            v: "vomecrty".into(),
            zeta: None,
            temperature: Some("votemper".into()),
            salinity: Some("vosaline".into()),
            kv: Some("votkeavt".into()),
        }
    }

    pub fn regular() -> Self {
        Self {
            time: "time".into(),
            u: "uo".into(),
            v: "vo".into(),
            zeta: None,
            temperature: Some("thetao".into()),
            salinity: Some("so".into()),
            kv: None,
        }
    }
}

/// Grid convention of the archives and its static-grid options.
#[derive(Clone, Debug, PartialEq)]
pub enum GridConvention {
    Roms {
        names: RomsNames,
        mode: SCoordinateMode,
        /// Pattern of a separate grid file.
        grid_file: Option<String>,
    },
    Nemo {
        names: NemoNames,
        /// Patterns of the mask, horizontal mesh and vertical mesh files.
        mesh_files: Option<(String, String, String)>,
        periodic: bool,
    },
    Regular {
        names: RegularNames,
        grid_file: Option<String>,
        periodic: bool,
    },
}

impl Default for GridConvention {
    fn default() -> Self {
        Self::roms()
    }
}

impl GridConvention {
    pub fn roms() -> Self {
        Self::Roms {
            names: RomsNames::default(),
            mode: SCoordinateMode::Standard,
            grid_file: None,
        }
    }

    pub fn nemo() -> Self {
        Self::Nemo {
            names: NemoNames::default(),
            mesh_files: None,
            periodic: false,
        }
    }

    pub fn regular() -> Self {
        Self::Regular {
            names: RegularNames::default(),
            grid_file: None,
            periodic: false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Roms { .. } => "roms",
            Self::Nemo { .. } => "nemo",
            Self::Regular { .. } => "regular",
        }
    }

    /// Default variable names of the convention.
    pub fn default_variables(&self) -> VariableNames {
        match self {
            Self::Roms { .. } => VariableNames::roms(),
            Self::Nemo { .. } => VariableNames::nemo(),
            Self::Regular { .. } => VariableNames::regular(),
        }
    }

    /// Model loading the static grid of this convention.
    pub fn model(&self) -> Box<dyn OceanModel> {
        match self {
            Self::Roms {
                names,
                mode,
                grid_file,
            } => {
                let mut model = RomsModel::new().with_names(names.clone()).with_mode(*mode);
                if let Some(pattern) = grid_file {
                    model = model.with_grid_file(pattern.clone());
                }
                Box::new(model)
            }
            Self::Nemo {
                names,
                mesh_files,
                periodic,
            } => {
                let mut model = NemoModel::new()
                    .with_names(names.clone())
                    .with_periodic(*periodic);
                if let Some((mask, horizontal, vertical)) = mesh_files {
                    model = model.with_mesh_files(mask.clone(), horizontal.clone(), vertical.clone());
                }
                Box::new(model)
            }
            Self::Regular {
                names,
                grid_file,
                periodic,
            } => {
                let mut model = RegularModel::new()
                    .with_names(names.clone())
                    .with_periodic(*periodic);
                if let Some(pattern) = grid_file {
                    model = model.with_grid_file(pattern.clone());
                }
                Box::new(model)
            }
        }
    }
}

/// Configuration of a dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetConfig {
    pub convention: GridConvention,
    pub variables: VariableNames,
    /// Directory holding the archives, when read from disk.
    pub directory: Option<String>,
    /// Filename pattern of the velocity archives.
    pub pattern: String,
    /// Filename pattern of the tracer archives (temperature, salinity,
    /// diffusivity, named tracers) when they are stored apart.
    pub tracer_pattern: Option<String>,
    /// North-west and south-east corners `(lon, lat)` of the working domain.
    pub shrink: Option<((f64, f64), (f64, f64))>,
    pub time_arrow: TimeArrow,
    /// Simulation origin; archive times are re-based onto it.
    pub time_origin: Option<NaiveDateTime>,
    /// Archive times are rounded to this many seconds.
    pub time_rounding: f64,
    pub empty_stencil: EmptyStencilPolicy,
    pub scalar_method: ScalarMethod,
    pub require_temperature: bool,
    pub require_salinity: bool,
    pub require_kv: bool,
    /// Extra variables tracked under their own name.
    pub tracers: Vec<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self::new(GridConvention::default(), "*.nc")
    }
}

impl DatasetConfig {
    /// Configuration with the default variable names of `convention`.
    pub fn new(convention: GridConvention, pattern: impl Into<String>) -> Self {
        Self {
            variables: convention.default_variables(),
            convention,
            directory: None,
            pattern: pattern.into(),
            tracer_pattern: None,
            shrink: None,
            time_arrow: TimeArrow::Forward,
            time_origin: None,
            time_rounding: TimeConversion::default().rounding,
            empty_stencil: EmptyStencilPolicy::default(),
            scalar_method: ScalarMethod::default(),
            require_temperature: false,
            require_salinity: false,
            require_kv: false,
            tracers: Vec::new(),
        }
    }

    pub fn with_variables(mut self, variables: VariableNames) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_tracer_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.tracer_pattern = Some(pattern.into());
        self
    }

    pub fn with_shrink(mut self, north_west: (f64, f64), south_east: (f64, f64)) -> Self {
        self.shrink = Some((north_west, south_east));
        self
    }

    pub fn with_time_arrow(mut self, arrow: TimeArrow) -> Self {
        self.time_arrow = arrow;
        self
    }

    pub fn with_time_origin(mut self, origin: NaiveDateTime) -> Self {
        self.time_origin = Some(origin);
        self
    }

    pub fn with_empty_stencil(mut self, policy: EmptyStencilPolicy) -> Self {
        self.empty_stencil = policy;
        self
    }

    pub fn with_scalar_method(mut self, method: ScalarMethod) -> Self {
        self.scalar_method = method;
        self
    }

    /// Fail at setup when temperature, salinity or diffusivity are missing.
    pub fn with_required(mut self, temperature: bool, salinity: bool, kv: bool) -> Self {
        self.require_temperature = temperature;
        self.require_salinity = salinity;
        self.require_kv = kv;
        self
    }

    pub fn with_tracer(mut self, name: impl Into<String>) -> Self {
        self.tracers.push(name.into());
        self
    }

    pub fn model(&self) -> Box<dyn OceanModel> {
        self.convention.model()
    }

    pub fn time_conversion(&self) -> TimeConversion {
        TimeConversion {
            epoch: self.time_origin,
            rounding: self.time_rounding,
        }
    }

    /// Fields read at every record.
    pub fn fields(&self) -> Vec<FieldSpec> {
        let vars = &self.variables;
        let tracer = |spec: FieldSpec| match &self.tracer_pattern {
            Some(pattern) => spec.with_pattern(pattern.clone()),
            None => spec,
        };
        let scalar = |role: FieldRole, name: &Option<String>, required: bool| {
            name.as_ref().map(|variable| {
                tracer(if required {
                    FieldSpec::required(role, variable.clone())
                } else {
                    FieldSpec::optional(role, variable.clone())
                })
            })
        };

        let mut fields = vec![
            FieldSpec::required(FieldRole::U, vars.u.clone()),
            FieldSpec::required(FieldRole::V, vars.v.clone()),
        ];
        if let Some(zeta) = &vars.zeta {
            fields.push(FieldSpec::optional(FieldRole::Zeta, zeta.clone()));
        }
        fields.extend(scalar(FieldRole::Temperature, &vars.temperature, self.require_temperature));
        fields.extend(scalar(FieldRole::Salinity, &vars.salinity, self.require_salinity));
        fields.extend(scalar(FieldRole::Kv, &vars.kv, self.require_kv));
        fields.extend(
            self.tracers
                .iter()
                .map(|name| tracer(FieldSpec::optional(FieldRole::Tracer(name.clone()), name.clone()))),
        );
        fields
    }

    /// Read the dataset options.
    ///
    /// `grid` selects the convention (`roms`, `nemo`, `regular`) and
    /// `file_filter` the velocity archives; every other key is optional:
    /// `input_path`, `tracer_file_filter`, `grid_file`, `mask_file`,
    /// `hgr_file`, `zgr_file`, `periodic`, `s_coordinate`, the
    /// `field_var_*` names, `shrink_domain` with the
    /// `north-west-corner.*`/`south-east-corner.*` coordinates,
    /// `time_arrow`, `time_origin`, `time_rounding`, `empty_stencil`,
    /// `scalar_interpolation`, `require_*` flags and `tracers`.
    pub fn from_parameters(params: &ParameterSet) -> Result<Self, ConfigError> {
        let periodic = params.flag("periodic")?.unwrap_or(false);
        let grid_file = params.get("grid_file").map(str::to_string);
        let convention = match params.select("grid", "roms, nemo, regular", |s| match s {
            "roms" | "roms3d" => Some(0),
            "nemo" => Some(1),
            "regular" | "rectilinear" => Some(2),
            _ => None,
        })? {
            None | Some(0) => GridConvention::Roms {
                names: RomsNames::default(),
                mode: params
                    .select("s_coordinate", "standard, ucla", |s| match s {
                        "standard" | "rutgers" => Some(SCoordinateMode::Standard),
                        "ucla" | "generalized" => Some(SCoordinateMode::Ucla),
                        _ => None,
                    })?
                    .unwrap_or_default(),
                grid_file,
            },
            Some(1) => {
                let mesh = ["mask_file", "hgr_file", "zgr_file"].map(|k| params.get(k));
                let mesh_files = match mesh {
                    [Some(mask), Some(hgr), Some(zgr)] => {
                        Some((mask.to_string(), hgr.to_string(), zgr.to_string()))
                    }
                    [None, None, None] => None,
                    _ => {
                        let missing = ["mask_file", "hgr_file", "zgr_file"]
                            .into_iter()
                            .find(|k| !params.contains(k))
                            .unwrap_or("mask_file");
                        return Err(ConfigError::MissingKey(missing.to_string()));
                    }
                };
                GridConvention::Nemo {
                    names: NemoNames::default(),
                    mesh_files,
                    periodic,
                }
            }
            Some(_) => GridConvention::Regular {
                names: RegularNames::default(),
                grid_file,
                periodic,
            },
        };

        let pattern = params.require("file_filter")?;
        let mut config = Self::new(convention, pattern);

        let vars = &mut config.variables;
        let name = |key: &str, current: &mut String| {
            if let Some(v) = params.get(key) {
                *current = v.to_string();
            }
        };
        name("field_var_time", &mut vars.time);
        name("field_var_u", &mut vars.u);
        name("field_var_v", &mut vars.v);
        let optional = |key: &str, current: &mut Option<String>| {
            if let Some(v) = params.get(key) {
                *current = Some(v.to_string());
            }
        };
        optional("field_var_zeta", &mut vars.zeta);
        optional("field_var_temp", &mut vars.temperature);
        optional("field_var_salt", &mut vars.salinity);
        optional("field_var_kv", &mut vars.kv);

        config.directory = params.get("input_path").map(str::to_string);
        config.tracer_pattern = params.get("tracer_file_filter").map(str::to_string);

        if params.flag("shrink_domain")?.unwrap_or(false) {
            let corner = |key: &str| -> Result<f64, ConfigError> {
                let value = params.require(key)?;
                value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected a coordinate in degrees".into(),
                })
            };
            config.shrink = Some((
                (corner("north-west-corner.lon")?, corner("north-west-corner.lat")?),
                (corner("south-east-corner.lon")?, corner("south-east-corner.lat")?),
            ));
        }

        if let Some(arrow) = params.select("time_arrow", "forward, backward", |s| match s {
            "forward" | "1" => Some(TimeArrow::Forward),
            "backward" | "-1" => Some(TimeArrow::Backward),
            _ => None,
        })? {
            config.time_arrow = arrow;
        }
        if let Some(origin) = params.get("time_origin") {
            config.time_origin = Some(parse_date(origin).ok_or_else(|| ConfigError::InvalidValue {
                key: "time_origin".into(),
                value: origin.to_string(),
                reason: "expected a date such as 2000-01-01 00:00".into(),
            })?);
        }
        config.time_rounding = params.parse_or("time_rounding", config.time_rounding)?;
        if let Some(policy) = params.select(
            "empty_stencil",
            "zero, nan, domain_exit",
            |s| s.parse().ok(),
        )? {
            config.empty_stencil = policy;
        }
        if let Some(method) = params.select(
            "scalar_interpolation",
            "trilinear, closest, idw",
            |s| s.parse().ok(),
        )? {
            config.scalar_method = method;
        }
        config.require_temperature = params.flag("require_temperature")?.unwrap_or(false);
        config.require_salinity = params.flag("require_salinity")?.unwrap_or(false);
        config.require_kv = params.flag("require_kv")?.unwrap_or(false);
        config.tracers = params.list("tracers");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fields() {
        let config = DatasetConfig::new(GridConvention::roms(), "roms_his_*.nc");
        let fields = config.fields();
        let keys: Vec<&str> = fields.iter().map(FieldSpec::key).collect();
        assert_eq!(keys, ["u", "v", "zeta", "temperature", "salinity", "kv"]);
        assert!(fields[0].required && !fields[3].required);
        assert_eq!(fields[5].variable, "AKt");
    }

    #[test]
    fn test_tracer_pattern_applies_to_scalars() {
        let config = DatasetConfig::new(GridConvention::nemo(), "*_U.nc")
            .with_tracer_pattern("*_T.nc")
            .with_tracer("chl")
            .with_required(true, false, false);
        let fields = config.fields();
        assert!(fields.iter().all(|f| f.role != FieldRole::Zeta));
        let temp = fields.iter().find(|f| f.role == FieldRole::Temperature).unwrap();
        assert!(temp.required);
        assert_eq!(temp.pattern.as_deref(), Some("*_T.nc"));
        let chl = fields.last().unwrap();
        assert_eq!(chl.key(), "chl");
        assert_eq!(chl.pattern.as_deref(), Some("*_T.nc"));
        assert!(fields[0].pattern.is_none());
    }

    #[test]
    fn test_from_parameters() {
        let params = ParameterSet::new()
            .with("grid", "NEMO")
            .with("file_filter", "*_U.nc")
            .with("field_var_temp", "thetao")
            .with("shrink_domain", "true")
            .with("north-west-corner.lon", "-5.5")
            .with("north-west-corner.lat", "48.0")
            .with("south-east-corner.lon", "-1.0")
            .with("south-east-corner.lat", "43.5")
            .with("time_arrow", "backward")
            .with("time_origin", "1990-01-01 00:00")
            .with("empty_stencil", "domain_exit")
            .with("tracers", "chl");
        let config = DatasetConfig::from_parameters(&params).unwrap();
        assert_eq!(config.convention.name(), "nemo");
        assert_eq!(config.variables.u, "vozocrtx");
        assert_eq!(config.variables.temperature.as_deref(), Some("thetao"));
        assert_eq!(config.shrink, Some(((-5.5, 48.0), (-1.0, 43.5))));
        assert_eq!(config.time_arrow, TimeArrow::Backward);
        assert!(config.time_origin.is_some());
        assert_eq!(config.empty_stencil, EmptyStencilPolicy::DomainExit);
        assert_eq!(config.tracers, vec!["chl".to_string()]);
    }

    #[test]
    fn test_missing_keys() {
        let params = ParameterSet::new().with("grid", "roms");
        assert_eq!(
            DatasetConfig::from_parameters(&params),
            Err(ConfigError::MissingKey("file_filter".into()))
        );
        let partial_mesh = ParameterSet::new()
            .with("grid", "nemo")
            .with("file_filter", "*.nc")
            .with("mask_file", "mask.nc");
        assert_eq!(
            DatasetConfig::from_parameters(&partial_mesh),
            Err(ConfigError::MissingKey("hgr_file".into()))
        );
        let corners = ParameterSet::new()
            .with("file_filter", "*.nc")
            .with("shrink_domain", "yes");
        assert!(DatasetConfig::from_parameters(&corners).is_err());
    }
}
