use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Transform,
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Paradigm {
    Etl,
    Elt,
}

/// How one paradigm orders its stages and where the transform step lives.
#[derive(Debug, Clone, Serialize)]
pub struct ParadigmSummary {
    pub paradigm: Paradigm,
    pub title: &'static str,
    pub stages: [Stage; 3],
    pub transform_location: &'static str,
    pub description: &'static str,
}

impl Paradigm {
    pub fn stages(self) -> [Stage; 3] {
        match self {
            Paradigm::Etl => [Stage::Extract, Stage::Transform, Stage::Load],
            Paradigm::Elt => [Stage::Extract, Stage::Load, Stage::Transform],
        }
    }

    pub fn summary(self) -> ParadigmSummary {
        match self {
            Paradigm::Etl => ParadigmSummary {
                paradigm: self,
                title: "Classic ETL",
                stages: self.stages(),
                transform_location: "Small transform server between source and warehouse",
                description: "Data is cleaned on a dedicated middle tier before it reaches the warehouse.",
            },
            Paradigm::Elt => ParadigmSummary {
                paradigm: self,
                title: "Modern ELT",
                stages: self.stages(),
                transform_location: "Inside the destination data warehouse",
                description: "Raw data is loaded first and cloud warehouses (Snowflake, BigQuery) transform it after loading.",
            },
        }
    }
}

pub fn comparison() -> [ParadigmSummary; 2] {
    [Paradigm::Etl.summary(), Paradigm::Elt.summary()]
}
