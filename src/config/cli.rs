use crate::config::toml_config::TomlConfig;
use crate::core::report::{PolicyOverrides, Report};
use crate::utils::error::{QueryError, Result};
use crate::utils::validation::{validate_positive_number, Validate};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "k3-query")]
#[command(about = "Query K3Cloud bills and print normalized JSON to stdout")]
pub struct CliConfig {
    /// Path to the TOML connection config
    #[arg(short, long, env = "K3_QUERY_CONFIG", default_value = "k3cloud.toml")]
    pub config: String,

    /// Keep at most N values per group (grouped reports)
    #[arg(long)]
    pub max_per_group: Option<usize>,

    /// Keep duplicate values within a group
    #[arg(long)]
    pub no_dedupe: bool,

    /// Keep values in query order instead of sorting descending
    #[arg(long)]
    pub no_sort: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON on stderr
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Materials and lots picked for a production order
    PickLots { mo_number: String },
    /// Distinct child material numbers of a BOM
    BomItems { material_number: String },
    /// Latest lot numbers grouped by material name
    Lots {
        #[arg(required = true, value_delimiter = ',')]
        material_numbers: Vec<String>,
    },
    /// Lot numbers of every child material in a BOM
    BomLots { material_number: String },
    /// Materials referenced by production orders
    Materials,
    /// Material master records by number prefix
    ProductMaterials {
        #[arg(long, default_value = "2")]
        prefix: String,
    },
    /// Sales outbound bills grouped by customer
    Outstock {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long, default_value = "C")]
        status: String,
    },
    /// Raw query against any form
    Query {
        #[arg(long)]
        form: String,
        #[arg(long, required = true, value_delimiter = ',')]
        fields: Vec<String>,
        /// Equality filter, FIELD=VALUE (repeatable)
        #[arg(long = "filter-eq", value_parser = parse_key_value)]
        filter_eq: Vec<(String, String)>,
        #[arg(long)]
        order_by: Option<String>,
        #[arg(long, requires = "order_by")]
        desc: bool,
    },
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", raw))
}

impl CliConfig {
    pub fn report(&self) -> Report {
        match &self.command {
            Command::PickLots { mo_number } => Report::PickLots {
                mo_number: mo_number.clone(),
            },
            Command::BomItems { material_number } => Report::BomItems {
                material_number: material_number.clone(),
            },
            Command::Lots { material_numbers } => Report::Lots {
                material_numbers: material_numbers
                    .iter()
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect(),
            },
            Command::BomLots { material_number } => Report::BomLots {
                material_number: material_number.clone(),
            },
            Command::Materials => Report::Materials,
            Command::ProductMaterials { prefix } => Report::ProductMaterials {
                prefix: prefix.clone(),
            },
            Command::Outstock { from, to, status } => Report::Outstock {
                status: status.clone(),
                from: *from,
                to: *to,
            },
            Command::Query {
                form,
                fields,
                filter_eq,
                order_by,
                desc,
            } => Report::Custom {
                form_id: form.clone(),
                field_keys: fields.clone(),
                equals: filter_eq.clone(),
                order_by: order_by.as_ref().map(|field| (field.clone(), *desc)),
            },
        }
    }

    /// 命令列優先，其次設定檔，最後預設值
    pub fn policy_overrides(&self, file: &TomlConfig) -> PolicyOverrides {
        let defaults = PolicyOverrides::default();
        PolicyOverrides {
            max_per_group: self
                .max_per_group
                .or(file.max_per_group())
                .unwrap_or(defaults.max_per_group),
            dedupe: !self.no_dedupe && file.dedupe().unwrap_or(defaults.dedupe),
            sort_descending: !self.no_sort
                && file.sort_descending().unwrap_or(defaults.sort_descending),
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_per_group {
            validate_positive_number("--max-per-group", max, 1)?;
        }
        if let Command::Outstock { from, to, .. } = &self.command {
            if from > to {
                return Err(QueryError::ValidationError {
                    message: format!("--from {} is after --to {}", from, to),
                });
            }
        }
        Ok(())
    }
}
