/*!
Arborescence procfs/sysfs factice

Reproduit juste assez de `/proc` et `/sys/class/thermal` pour
l'échantillonneur. Le répertoire temporaire est supprimé avec la fixture.
*/

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub struct ProcFixture {
    dir: TempDir,
}

impl ProcFixture {
    /// Crée `proc/`, `proc/net/` et `sys/class/thermal/` (vides)
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("Impossible de créer le répertoire temporaire")?;
        fs::create_dir_all(dir.path().join("proc/net"))?;
        fs::create_dir_all(dir.path().join("sys/class/thermal"))?;
        log::debug!("procfs factice dans {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Racine à passer à `ProcSources::under`
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Écrit un fichier relatif à la racine
    pub fn write_file(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Écriture de {}", path.display()))
    }

    /// `/proc/stat` avec une ligne agrégée et un cœur
    pub fn write_stat(&self, user: u64, nice: u64, system: u64, idle: u64) -> Result<()> {
        let content = format!(
            "cpu  {user} {nice} {system} {idle} 0 0 0 0 0 0\n\
             cpu0 {user} {nice} {system} {idle} 0 0 0 0 0 0\n\
             intr 0\n\
             ctxt 0\n"
        );
        self.write_file("proc/stat", &content)
    }

    /// `/proc/meminfo`, valeurs en kB
    pub fn write_meminfo(&self, total_kb: u64, free_kb: u64, cached_kb: u64) -> Result<()> {
        let content = format!(
            "MemTotal:       {total_kb} kB\n\
             MemFree:        {free_kb} kB\n\
             MemAvailable:   {free_kb} kB\n\
             Buffers:        0 kB\n\
             Cached:         {cached_kb} kB\n\
             SwapCached:     0 kB\n"
        );
        self.write_file("proc/meminfo", &content)
    }

    /// `/proc/net/dev` avec une ligne par interface `(nom, rx_octets, tx_octets)`
    pub fn write_net_dev(&self, interfaces: &[(&str, u64, u64)]) -> Result<()> {
        let mut content = String::from(
            "Inter-|   Receive                                                |  Transmit\n \
             face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n",
        );
        for (name, rx, tx) in interfaces {
            content.push_str(&format!(
                "{name:>6}: {rx} 0 0 0 0 0 0 0 {tx} 0 0 0 0 0 0 0\n"
            ));
        }
        self.write_file("proc/net/dev", &content)
    }

    /// Ajoute `sys/class/thermal/<name>/temp` en millidegrés
    pub fn add_thermal_zone(&self, name: &str, millidegrees: i64) -> Result<()> {
        self.write_file(
            &format!("sys/class/thermal/{name}/temp"),
            &format!("{millidegrees}\n"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let fx = ProcFixture::new().unwrap();
        assert!(fx.root().join("proc/net").is_dir());
        assert!(fx.root().join("sys/class/thermal").is_dir());

        fx.add_thermal_zone("thermal_zone0", 42000).unwrap();
        let temp = fs::read_to_string(fx.root().join("sys/class/thermal/thermal_zone0/temp")).unwrap();
        assert_eq!(temp, "42000\n");
    }

    #[test]
    fn test_net_dev_columns() {
        let fx = ProcFixture::new().unwrap();
        fx.write_net_dev(&[("eth0", 11, 22)]).unwrap();
        let content = fs::read_to_string(fx.root().join("proc/net/dev")).unwrap();
        let line = content.lines().nth(2).unwrap();
        let counters: Vec<&str> = line.split(':').nth(1).unwrap().split_whitespace().collect();
        assert_eq!(counters.len(), 16);
        assert_eq!(counters[0], "11");
        assert_eq!(counters[8], "22");
    }
}
