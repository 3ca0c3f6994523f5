use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use costboard::api::http::HttpBoardApi;
use costboard::config::{ApiConfig, ConfigError};
use costboard::geometry::{Point, Rect};
use costboard::scene::{EntityId, ResourceId, ResourceRef, Scene};
use costboard::{Action, ApiError, BoardSession, EngineConfig, View};
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("backend client error: {0}")]
    Api(#[from] ApiError),
    #[error("board {0} not found")]
    BoardNotFound(Uuid),
    #[error("session rejected by backend; log in again and refresh COSTBOARD_SESSION_TOKEN")]
    Unauthorized,
    #[error("no group with backend id {0} on this board")]
    UnknownGroup(Uuid),
    #[error("no placement with backend id {0} on this board")]
    UnknownPlacement(Uuid),
    #[error("operation did not complete: {0}")]
    Rejected(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "costboard", about = "Drive the cost board engine against a live backend")]
struct Cli {
    #[arg(long, env = "COSTBOARD_API_URL", default_value = "http://127.0.0.1:8000")]
    base_url: String,

    #[arg(long, env = "COSTBOARD_SESSION_TOKEN")]
    session_token: Option<String>,

    /// Open boards without writing anything back.
    #[arg(long, default_value_t = false)]
    read_only: bool,

    /// Print every engine action as a JSON line on stderr.
    #[arg(long, default_value_t = false)]
    actions: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print groups, rolled-up costs and cards.
    Show { board_id: Uuid },
    /// Print only group costs.
    Costs { board_id: Uuid },
    /// Draw a group; it is shifted off existing groups if needed.
    Group(GroupArgs),
    /// Place a resource card.
    Place(PlaceArgs),
    /// Place another card for the resource behind an existing placement.
    Clone { board_id: Uuid, placement_id: Uuid },
    /// Delete a group (releasing its cards) or a placement.
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
struct GroupArgs {
    board_id: Uuid,
    #[arg(long)]
    name: String,
    #[arg(long)]
    color: Option<String>,
    #[arg(long, default_value_t = 0.0)]
    x: f64,
    #[arg(long, default_value_t = 0.0)]
    y: f64,
    #[arg(long, default_value_t = 300.0)]
    width: f64,
    #[arg(long, default_value_t = 200.0)]
    height: f64,
}

#[derive(Args, Debug)]
struct PlaceArgs {
    board_id: Uuid,
    #[arg(long)]
    resource_id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "type", default_value = "unknown")]
    resource_type: String,
    #[arg(long, default_value = "aws")]
    provider: String,
    #[arg(long, default_value_t = 0.0)]
    x: f64,
    #[arg(long, default_value_t = 0.0)]
    y: f64,
}

#[derive(Args, Debug)]
struct DeleteArgs {
    board_id: Uuid,
    #[arg(long, conflicts_with = "placement", required_unless_present = "placement")]
    group: Option<Uuid>,
    #[arg(long)]
    placement: Option<Uuid>,
}

/// Session plus the output options shared by every subcommand.
struct Runner {
    session: BoardSession,
    print_actions: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let api_config = api_config(&cli)?;
    let api = HttpBoardApi::new(&api_config)?;
    let mut engine_config = EngineConfig::from_env();
    engine_config.read_only |= cli.read_only;
    let mut runner = Runner { session: BoardSession::new(Arc::new(api), engine_config), print_actions: cli.actions };

    let result = runner.run(cli.command).await;
    let closing = runner.session.close_board().await;
    runner.report(&closing)?;
    result
}

/// Command-line flags take precedence; everything else comes from the environment.
fn api_config(cli: &Cli) -> Result<ApiConfig, ConfigError> {
    ApiConfig::from_lookup(|key| match key {
        "COSTBOARD_API_URL" => Some(cli.base_url.clone()),
        "COSTBOARD_SESSION_TOKEN" => cli.session_token.clone(),
        other => std::env::var(other).ok(),
    })
}

impl Runner {
    async fn run(&mut self, command: Command) -> Result<(), CliError> {
        match command {
            Command::Show { board_id } => {
                self.open(board_id).await?;
                print_json(&self.board_summary())
            }
            Command::Costs { board_id } => {
                self.open(board_id).await?;
                print_json(&group_costs(self.scene()))
            }
            Command::Group(args) => {
                self.open(args.board_id).await?;
                let rect = Rect::new(args.x, args.y, args.width, args.height);
                let actions = self.session.create_group(args.name, args.color, rect).await;
                self.report(&actions)?;
                let id = created(&actions)?;
                print_json(&self.entity_summary(id))
            }
            Command::Place(args) => {
                self.open(args.board_id).await?;
                let resource = ResourceRef {
                    name: args.name.unwrap_or_else(|| args.resource_id.clone()),
                    id: ResourceId::new(args.resource_id),
                    resource_type: args.resource_type,
                    provider: args.provider,
                };
                let actions = self.session.place_resource(resource, Point::new(args.x, args.y)).await;
                self.report(&actions)?;
                let id = created(&actions)?;
                print_json(&self.entity_summary(id))
            }
            Command::Clone { board_id, placement_id } => {
                self.open(board_id).await?;
                let card = self.card_by_placement(placement_id)?;
                let actions = self.session.clone_placement(card).await;
                self.report(&actions)?;
                let id = created(&actions)?;
                print_json(&self.entity_summary(id))
            }
            Command::Delete(args) => {
                self.open(args.board_id).await?;
                let target = match (args.group, args.placement) {
                    (Some(group), _) => self.group_by_remote(group)?,
                    (None, Some(placement)) => self.card_by_placement(placement)?,
                    (None, None) => return Err(CliError::Rejected("nothing to delete".into())),
                };
                let actions = self.session.delete_entity(target).await;
                self.report(&actions)?;
                print_json(&self.board_summary())
            }
        }
    }

    async fn open(&mut self, board_id: Uuid) -> Result<(), CliError> {
        let actions = self.session.open_board(board_id).await;
        self.report(&actions)?;
        match self.session.view() {
            View::Board { .. } => Ok(()),
            View::List => Err(CliError::BoardNotFound(board_id)),
        }
    }

    /// Echo actions if asked, and turn the ones that end the command into errors.
    fn report(&self, actions: &[Action]) -> Result<(), CliError> {
        for action in actions {
            if self.print_actions {
                eprintln!("{}", serde_json::to_string(action)?);
            }
            match action {
                Action::RedirectToLogin => return Err(CliError::Unauthorized),
                Action::Status { message } => eprintln!("{message}"),
                _ => {}
            }
        }
        Ok(())
    }

    fn scene(&self) -> Option<&Scene> {
        self.session.scene()
    }

    fn group_by_remote(&self, remote: Uuid) -> Result<EntityId, CliError> {
        self.scene()
            .and_then(|s| s.group_by_remote(remote))
            .map(|g| g.id)
            .ok_or(CliError::UnknownGroup(remote))
    }

    fn card_by_placement(&self, placement: Uuid) -> Result<EntityId, CliError> {
        self.scene()
            .and_then(|s| s.cards().find(|c| c.placement_id == Some(placement)))
            .map(|c| c.id)
            .ok_or(CliError::UnknownPlacement(placement))
    }

    fn board_summary(&self) -> Value {
        let Some(scene) = self.scene() else {
            return Value::Null;
        };
        let cards: Vec<Value> = scene
            .cards()
            .map(|c| {
                json!({
                    "placement_id": c.placement_id,
                    "resource_id": c.resource.id,
                    "name": c.resource.name,
                    "group_id": c.group.and_then(|g| scene.group(g)).and_then(|g| g.remote_id),
                    "position": c.rect.origin(),
                    "multiplicity_badge": c.multiplicity_badge,
                })
            })
            .collect();
        json!({
            "board_id": self.session.board_id(),
            "name": self.session.board_name(),
            "read_only": self.session.is_read_only(),
            "groups": group_costs(Some(scene)),
            "cards": cards,
            "annotations": scene.annotations().count(),
        })
    }

    fn entity_summary(&self, id: EntityId) -> Value {
        let Some(scene) = self.scene() else {
            return Value::Null;
        };
        if let Some(group) = scene.group(id) {
            return json!({ "group_id": group.remote_id, "name": group.name, "rect": group.rect });
        }
        if let Some(card) = scene.card(id) {
            return json!({
                "placement_id": card.placement_id,
                "resource_id": card.resource.id,
                "group_id": card.group.and_then(|g| scene.group(g)).and_then(|g| g.remote_id),
                "position": card.rect.origin(),
            });
        }
        Value::Null
    }
}

fn group_costs(scene: Option<&Scene>) -> Value {
    let Some(scene) = scene else {
        return Value::Null;
    };
    let groups: Vec<Value> = scene
        .groups()
        .map(|g| {
            let members = scene.cards().filter(|c| c.group == Some(g.id)).count();
            json!({
                "group_id": g.remote_id,
                "name": g.name,
                "color": g.color,
                "members": members,
                "cost": g.cost,
            })
        })
        .collect();
    Value::Array(groups)
}

/// The entity a create call added, or why it was not kept.
fn created(actions: &[Action]) -> Result<EntityId, CliError> {
    let added = actions.iter().find_map(|a| match a {
        Action::EntityAdded { id } => Some(*id),
        _ => None,
    });
    let rolled_back = added.is_some_and(|id| actions.contains(&Action::EntityRemoved { id }));
    match added {
        Some(id) if !rolled_back => Ok(id),
        _ => {
            let reason = actions
                .iter()
                .find_map(|a| match a {
                    Action::Status { message } => Some(message.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| "entity was not created".to_owned());
            Err(CliError::Rejected(reason))
        }
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
