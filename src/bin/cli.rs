// Room Provisioner CLI
// Operator tool for inspecting and driving the provisioning service over its HTTP API

use clap::{Parser, Subcommand};
use colored::*;

#[derive(Parser)]
#[command(name = "room-cli")]
#[command(about = "Room Provisioner admin CLI", long_about = None)]
struct Cli {
    /// Server address (default: 127.0.0.1:8080)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service health endpoint
    Health,

    /// Create a room
    Create {
        /// Room title (defaults to the generated id)
        #[arg(short, long)]
        title: Option<String>,

        /// Owning user id
        #[arg(short, long)]
        user_id: Option<String>,
    },

    /// List every known room
    List,

    /// Show a room's stored record
    Get {
        /// Room id
        room_id: String,
    },

    /// Refresh and show a room's live runtime status
    Status {
        /// Room id
        room_id: String,
    },

    /// Rename a room
    Rename {
        /// Room id
        room_id: String,

        /// New title
        name: String,
    },

    /// Tear a room down
    Delete {
        /// Room id
        room_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match &cli.command {
        Commands::Health => check_health(&client, &cli.server).await,
        Commands::Create { title, user_id } => {
            create_room(&client, &cli.server, title.as_deref(), user_id.as_deref()).await
        }
        Commands::List => list_rooms(&client, &cli.server).await,
        Commands::Get { room_id } => {
            show_json(&client, &cli.server, &format!("room/{}", room_id)).await
        }
        Commands::Status { room_id } => {
            show_json(&client, &cli.server, &format!("room/status/{}", room_id)).await
        }
        Commands::Rename { room_id, name } => rename_room(&client, &cli.server, room_id, name).await,
        Commands::Delete { room_id } => delete_room(&client, &cli.server, room_id).await,
    }
}

async fn check_health(client: &reqwest::Client, server: &str) {
    println!("{}", "Checking service health...".cyan());

    let url = format!("http://{}/provisioner/health", server);
    match client.get(&url).send().await {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                println!("{} Health check passed", "✓".green());

                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
                    println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
                    println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
                }
            } else {
                println!("{} Health check failed: {}", "✗".red(), status);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            println!("  Make sure the service is running on {}", server);
        }
    }
}

async fn create_room(
    client: &reqwest::Client,
    server: &str,
    title: Option<&str>,
    user_id: Option<&str>,
) {
    println!("{}", "Creating room...".cyan());

    let url = format!("http://{}/room/create", server);
    let body = serde_json::json!({ "title": title, "userId": user_id });

    match client.post(&url).json(&body).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!(
                        "{} Room created: {}",
                        "✓".green(),
                        body["roomId"].as_str().unwrap_or("?")
                    );
                    println!(
                        "  Host: {}",
                        body["room"]["host"].as_str().unwrap_or("unknown")
                    );
                }
            } else {
                report_failure("Create", resp).await;
            }
        }
        Err(e) => println!("{} Cannot connect to server: {}", "✗".red(), e),
    }
}

async fn list_rooms(client: &reqwest::Client, server: &str) {
    let url = format!("http://{}/room/list", server);

    match client.get(&url).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                let rooms: Vec<serde_json::Value> = resp.json().await.unwrap_or_default();
                if rooms.is_empty() {
                    println!("{}", "No rooms".yellow());
                    return;
                }
                for room in rooms {
                    let flag = if room["mustBeCleaned"].as_bool().unwrap_or(false) {
                        "stale".red()
                    } else {
                        "ok".green()
                    };
                    println!(
                        "{}  {}  students={}  [{}]",
                        room["id"].as_str().unwrap_or("?"),
                        room["name"].as_str().unwrap_or("?"),
                        room["studentCount"].as_u64().unwrap_or(0),
                        flag,
                    );
                }
            } else {
                report_failure("List", resp).await;
            }
        }
        Err(e) => println!("{} Cannot connect to server: {}", "✗".red(), e),
    }
}

async fn show_json(client: &reqwest::Client, server: &str, path: &str) {
    let url = format!("http://{}/{}", server, path);

    match client.get(&url).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
                }
            } else {
                report_failure("Fetch", resp).await;
            }
        }
        Err(e) => println!("{} Cannot connect to server: {}", "✗".red(), e),
    }
}

async fn rename_room(client: &reqwest::Client, server: &str, room_id: &str, name: &str) {
    let url = format!("http://{}/room/rename", server);
    let body = serde_json::json!({ "roomId": room_id, "name": name });

    match client.put(&url).json(&body).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                println!("{} Room {} renamed to '{}'", "✓".green(), room_id, name);
            } else {
                report_failure("Rename", resp).await;
            }
        }
        Err(e) => println!("{} Cannot connect to server: {}", "✗".red(), e),
    }
}

async fn delete_room(client: &reqwest::Client, server: &str, room_id: &str) {
    println!("{}", format!("Deleting room {}...", room_id).cyan());

    let url = format!("http://{}/room/delete/{}", server, room_id);
    match client.delete(&url).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                println!("{} Room deleted", "✓".green());
            } else {
                report_failure("Delete", resp).await;
            }
        }
        Err(e) => println!("{} Cannot connect to server: {}", "✗".red(), e),
    }
}

async fn report_failure(action: &str, resp: reqwest::Response) {
    let status = resp.status();
    let detail = resp
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|b| b["error"].as_str().map(str::to_string))
        .unwrap_or_default();
    println!("{} {} failed: {} {}", "✗".red(), action, status, detail);
}
