use clap::{Parser, Subcommand};

use crate::recommend::{DietaryRestriction, HealthGoal};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to an ingredient catalog JSON document; uses the embedded
    /// catalog when omitted
    #[arg(long)]
    pub catalog: Option<String>,

    /// Directory for the persisted health model artifacts
    #[arg(long, default_value = "data/models")]
    pub model_dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a recipe file (JSON array of {"name", "amount_g"})
    Analyze {
        /// Path to the recipe file
        recipe_file: String,
    },
    /// Suggest goal-directed improvements for a recipe file
    Improve {
        /// Path to the recipe file
        recipe_file: String,
        /// Health goal, repeatable
        #[arg(long = "goal", value_enum)]
        goals: Vec<HealthGoal>,
    },
    /// Rank substitution candidates for one ingredient
    Substitute {
        /// Ingredient name to replace
        ingredient: String,
        /// Dietary restriction, repeatable
        #[arg(long = "restriction", value_enum)]
        restrictions: Vec<DietaryRestriction>,
    },
    /// Generate a snack recipe from goals and flavor preferences
    Recommend {
        /// Health goal, repeatable
        #[arg(long = "goal", value_enum)]
        goals: Vec<HealthGoal>,
        /// Flavor preference (e.g. chocolate, sweet), repeatable
        #[arg(long = "flavor")]
        flavors: Vec<String>,
    },
    /// Break down each ingredient's share of the recipe's nutrition
    Contributions {
        /// Path to the recipe file
        recipe_file: String,
    },
    /// Compare two recipe files metric by metric
    Compare {
        /// Path to the first recipe file
        recipe_file_a: String,
        /// Path to the second recipe file
        recipe_file_b: String,
    },
    /// Ask a free-form nutrition question
    Chat {
        /// The question to ask
        message: String,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
