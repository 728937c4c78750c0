use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{error, info};
use vehicle_registry_core::{
    models::current_max_year, Mutation, NewVehicle, VehicleRecord, VehicleRegistry, VehicleUpdate,
};

const COMMAND_HINT: &str = "Commands: 'add', 'list', 'find <ID>', 'remove <ID>', 'update <ID>', 'help' or 'exit'.";

/// A parsed line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Add,
    List,
    Find(String),
    Remove(String),
    Update(String),
    Help,
    Exit,
    MissingId(&'static str),
    Unknown(String),
}

impl Command {
    /// Parse a command line; blank lines yield `None`.
    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let verb = parts.next()?.to_lowercase();
        let id = parts.next().map(str::to_string);

        let command = match (verb.as_str(), id) {
            ("add", _) => Self::Add,
            ("list", _) => Self::List,
            ("help", _) => Self::Help,
            ("exit" | "quit", _) => Self::Exit,
            ("find", Some(id)) => Self::Find(id),
            ("remove", Some(id)) => Self::Remove(id),
            ("update", Some(id)) => Self::Update(id),
            ("find", None) => Self::MissingId("find"),
            ("remove", None) => Self::MissingId("remove"),
            ("update", None) => Self::MissingId("update"),
            (other, _) => Self::Unknown(other.to_string()),
        };
        Some(command)
    }
}

/// Interactive command loop driving a [`VehicleRegistry`].
pub struct ConsoleApp<R, W> {
    registry: VehicleRegistry,
    lines: Lines<R>,
    out: W,
}

impl<R, W> ConsoleApp<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(registry: VehicleRegistry, input: R, out: W) -> Self {
        Self {
            registry,
            lines: input.lines(),
            out,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let loaded = self.registry.len();
        if loaded > 0 {
            writeln!(self.out, "Loaded {loaded} vehicle(s) from {}.", self.registry.path().display())?;
        }
        writeln!(self.out, "Imported vehicle registry.")?;
        writeln!(self.out, "{COMMAND_HINT}")?;
        info!(records = loaded, "console session started");

        loop {
            let Some(line) = self.prompt("\n> ").await? else {
                break;
            };
            let Some(command) = Command::parse(&line) else {
                continue;
            };

            match command {
                Command::Add => self.add().await?,
                Command::List => self.list()?,
                Command::Find(id) => self.find(&id)?,
                Command::Remove(id) => self.remove(&id)?,
                Command::Update(id) => self.update(&id).await?,
                Command::Help => writeln!(self.out, "{COMMAND_HINT}")?,
                Command::Exit => {
                    writeln!(self.out, "Goodbye!")?;
                    break;
                }
                Command::MissingId(verb) => writeln!(self.out, "usage: {verb} <ID>")?,
                Command::Unknown(verb) => {
                    writeln!(self.out, "Unknown command '{verb}'. {COMMAND_HINT}")?
                }
            }
        }

        info!("console session closed");
        Ok(())
    }

    async fn add(&mut self) -> Result<()> {
        writeln!(self.out, "\n--- New imported vehicle ---")?;

        let Some(make) = self.required("Make: ", "make").await? else {
            return Ok(());
        };
        let Some(model) = self.required("Model: ", "model").await? else {
            return Ok(());
        };

        let max_year = current_max_year();
        let year = self.prompt("Year: ").await?.unwrap_or_default();
        let year = match year.parse::<i32>() {
            Ok(year) if year > 0 && year <= max_year => year,
            _ => {
                writeln!(self.out, "Error: year must be a whole number between 1 and {max_year}.")?;
                return Ok(());
            }
        };

        let color = self.prompt("Color: ").await?.unwrap_or_default();

        let price = self.prompt("Price: ").await?.unwrap_or_default();
        let price = match price.parse::<f64>() {
            Ok(price) if price.is_finite() && price > 0.0 => price,
            _ => {
                writeln!(self.out, "Error: price must be a positive number.")?;
                return Ok(());
            }
        };

        let Some(origin_country) = self.required("Country of origin: ", "country of origin").await?
        else {
            return Ok(());
        };

        let fields = NewVehicle {
            make,
            model,
            year,
            color,
            price,
            origin_country,
        };
        match self.registry.create(fields) {
            Ok(created) => {
                writeln!(
                    self.out,
                    "Vehicle '{}' registered with ID: {}",
                    created.value.display_name(),
                    created.value.id
                )?;
                self.report_persist(&created)?;
            }
            Err(err) => writeln!(self.out, "Error: {err}")?,
        }
        Ok(())
    }

    fn list(&mut self) -> Result<()> {
        let records = self.registry.list();
        if records.is_empty() {
            writeln!(self.out, "\nNo vehicles registered yet.")?;
            return Ok(());
        }

        writeln!(self.out, "\n--- Imported vehicles ({}) ---", records.len())?;
        for record in &records {
            writeln!(self.out, "{record}")?;
        }
        Ok(())
    }

    fn find(&mut self, id: &str) -> Result<()> {
        match self.registry.get(id) {
            Ok(record) => {
                writeln!(self.out, "\n--- Vehicle found ---")?;
                writeln!(self.out, "{record}")?;
            }
            Err(err) => writeln!(self.out, "{err}")?,
        }
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        match self.registry.delete(id) {
            Ok(removed) => {
                writeln!(
                    self.out,
                    "Vehicle '{}' ({}) removed.",
                    removed.value.display_name(),
                    removed.value.id
                )?;
                self.report_persist(&removed)?;
            }
            Err(err) => writeln!(self.out, "{err}")?,
        }
        Ok(())
    }

    async fn update(&mut self, id: &str) -> Result<()> {
        let current = match self.registry.get(id) {
            Ok(record) => record,
            Err(err) => {
                writeln!(self.out, "{err}")?;
                return Ok(());
            }
        };

        writeln!(self.out, "\n--- Update vehicle {id} (Enter keeps the current value) ---")?;
        writeln!(self.out, "Current: {current}")?;

        let update = self.collect_update(&current).await?;
        if update.is_empty() {
            writeln!(self.out, "Nothing to change.")?;
            return Ok(());
        }

        match self.registry.update(id, update) {
            Ok(updated) => {
                for rejected in &updated.value.rejected {
                    writeln!(self.out, "Warning: {rejected}; keeping current value.")?;
                }
                writeln!(self.out, "Vehicle {id} updated.")?;
                self.report_persist(&updated)?;
            }
            Err(err) => writeln!(self.out, "{err}")?,
        }
        Ok(())
    }

    async fn collect_update(&mut self, current: &VehicleRecord) -> Result<VehicleUpdate> {
        let make = self.prompt(&format!("Make [{}]: ", current.make)).await?;
        let model = self.prompt(&format!("Model [{}]: ", current.model)).await?;
        let year = self.prompt(&format!("Year [{}]: ", current.year)).await?;
        let year = self.parse_optional::<i32>(year, "year")?;
        let color = self.prompt(&format!("Color [{}]: ", current.color)).await?;
        let price = self.prompt(&format!("Price [{:.2}]: ", current.price)).await?;
        let price = self.parse_optional::<f64>(price, "price")?;
        let origin_country = self
            .prompt(&format!("Country of origin [{}]: ", current.origin_country))
            .await?;

        Ok(VehicleUpdate {
            make,
            model,
            year,
            color,
            price,
            origin_country,
        })
    }

    fn parse_optional<T: std::str::FromStr>(
        &mut self,
        raw: Option<String>,
        label: &str,
    ) -> Result<Option<T>> {
        let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
            return Ok(None);
        };
        match raw.parse() {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                writeln!(self.out, "Invalid {label} '{raw}'; keeping current value.")?;
                Ok(None)
            }
        }
    }

    fn report_persist<T>(&mut self, mutation: &Mutation<T>) -> Result<()> {
        if let Some(err) = &mutation.persist_error {
            writeln!(self.out, "Warning: changes kept in memory but not saved: {err}")?;
        }
        Ok(())
    }

    /// Prompt for a value that must not be blank.
    async fn required(&mut self, prompt: &str, label: &str) -> Result<Option<String>> {
        match self.prompt(prompt).await? {
            Some(value) if !value.is_empty() => Ok(Some(value)),
            _ => {
                writeln!(self.out, "Error: {label} must not be empty.")?;
                Ok(None)
            }
        }
    }

    /// Print `prompt` and read one trimmed line; `None` at end of input.
    async fn prompt(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        match self.lines.next_line().await {
            Ok(line) => Ok(line.map(|line| line.trim().to_string())),
            Err(err) => {
                error!(?err, "failed to read console input");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn registry() -> Result<(TempDir, VehicleRegistry)> {
        let dir = tempdir()?;
        let registry = VehicleRegistry::open(dir.path().join("cars.json"))?;
        Ok((dir, registry))
    }

    async fn run_script(registry: &VehicleRegistry, script: &str) -> Result<String> {
        let mut app = ConsoleApp::new(registry.clone(), script.as_bytes(), Vec::new());
        app.run().await?;
        Ok(String::from_utf8(app.out)?)
    }

    fn sample() -> NewVehicle {
        NewVehicle {
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2020,
            color: "Silver".to_string(),
            price: 95_000.0,
            origin_country: "Japan".to_string(),
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("   "), None);
        assert_eq!(Command::parse("LIST"), Some(Command::List));
        assert_eq!(
            Command::parse("  Find car_12 extra"),
            Some(Command::Find("car_12".to_string()))
        );
        assert_eq!(Command::parse("remove"), Some(Command::MissingId("remove")));
        assert_eq!(Command::parse("quit"), Some(Command::Exit));
        assert_eq!(
            Command::parse("drive car_1"),
            Some(Command::Unknown("drive".to_string()))
        );
    }

    #[tokio::test]
    async fn add_then_list() -> Result<()> {
        let (_dir, registry) = registry()?;
        let output = run_script(
            &registry,
            "add\nToyota\nCorolla\n2020\n\n95000\nJapan\nlist\nexit\n",
        )
        .await?;

        assert!(output.contains("Vehicle 'Toyota Corolla' registered with ID: car_"));
        assert!(output.contains("Make: Toyota | Model: Corolla | Year: 2020 | Color:  | Price: 95000.00"));
        assert!(output.contains("Goodbye!"));

        let records = registry.list();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].origin_country, "Japan");
        assert_eq!(VehicleRegistry::open(registry.path())?.list(), records);
        Ok(())
    }

    #[tokio::test]
    async fn add_aborts_on_invalid_input() -> Result<()> {
        let (_dir, registry) = registry()?;
        let output = run_script(&registry, "add\nToyota\nCorolla\n0\nadd\n\n").await?;

        assert!(output.contains("Error: year must be a whole number"));
        assert!(output.contains("Error: make must not be empty."));
        assert!(registry.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn update_keeps_blank_and_unparsable_fields() -> Result<()> {
        let (_dir, registry) = registry()?;
        let original = registry.create(sample())?.value;

        let script = format!("update {}\n\nCamry\nabc\n\n-5\n\nexit\n", original.id);
        let output = run_script(&registry, &script).await?;

        assert!(output.contains("Invalid year 'abc'; keeping current value."));
        assert!(output.contains("Warning: invalid price"));
        assert!(output.contains(&format!("Vehicle {} updated.", original.id)));

        let updated = registry.get(&original.id)?;
        assert_eq!(
            updated,
            VehicleRecord {
                model: "Camry".to_string(),
                ..original
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn remove_and_report_missing_ids() -> Result<()> {
        let (_dir, registry) = registry()?;
        let record = registry.create(sample())?.value;

        let script = format!(
            "find\nfind car_0\nremove {id}\nfind {id}\nupdate car_0\nfrobnicate\n",
            id = record.id
        );
        let output = run_script(&registry, &script).await?;

        assert!(output.contains("usage: find <ID>"));
        assert!(output.contains("vehicle 'car_0' not found"));
        assert!(output.contains(&format!("Vehicle 'Toyota Corolla' ({}) removed.", record.id)));
        assert!(output.contains(&format!("vehicle '{}' not found", record.id)));
        assert!(output.contains("Unknown command 'frobnicate'"));
        assert!(registry.is_empty());
        Ok(())
    }
}
