//! Routing of mixed local and remote paths onto connections.
//!
//! Remote paths go to the session connection, local paths to a connection
//! over the local filesystem, and transfers between the two use the
//! recursive push and pull operations.

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::glob::{self, Globber};
use crate::path::{self, split_by_locality, GenericPath};
use crate::settings::Settings;

/// Parses user paths, applies the remote prefix and expands remote wildcards.
///
/// Local paths are passed through untouched; the shell has already expanded them.
pub async fn expand_paths(
    conn: &mut Connection,
    raw: &[String],
    remote_prefix: &str,
    recursive: bool,
) -> Result<Vec<GenericPath>> {
    tracing::debug!("expanding wildcards in {:?}", raw);
    let mut expanded = Vec::with_capacity(raw.len());
    for item in raw {
        let parsed = GenericPath::parse(item).with_remote_prefix(remote_prefix);
        if parsed.remote && glob::has_magic(&parsed.path) {
            let matches = Globber::new(conn).glob(&parsed.path, recursive).await?;
            expanded.extend(matches.iter().map(|m| GenericPath::remote(m)));
        } else {
            expanded.push(parsed);
        }
    }
    Ok(expanded)
}

/// A connection to the local filesystem sharing the session's masks.
pub fn local_connection(conn: &Connection) -> Result<Connection> {
    let settings = Settings {
        text_transmission: false,
        ..conn.settings().clone()
    };
    Connection::local(settings)
}

/// Picks the connection that owns `path`.
pub fn connection_for<'a>(
    remote: &'a mut Connection,
    local: &'a mut Connection,
    path: &GenericPath,
) -> &'a mut Connection {
    if path.remote {
        remote
    } else {
        local
    }
}

async fn is_dir(conn: &mut Connection, local: &mut Connection, path: &GenericPath) -> Result<bool> {
    connection_for(conn, local, path).is_dir(&path.path).await
}

async fn check_batch(
    verb: &'static str,
    conn: &mut Connection,
    local: &mut Connection,
    sources: &[GenericPath],
    dest: &GenericPath,
    dest_dir: bool,
) -> Result<()> {
    if sources.len() > 1 && !dest_dir {
        let target_exists = connection_for(conn, local, dest).lexists(&dest.path).await?;
        return Err(Error::TooManySources {
            verb,
            target: dest.to_string(),
            target_exists,
        });
    }
    Ok(())
}

fn target_for(source: &str, dest: &GenericPath, dest_dir: bool) -> String {
    if dest_dir {
        path::join(&dest.path, path::basename(source))
    } else {
        dest.path.clone()
    }
}

/// `cp` across sides.
pub async fn generic_cp(
    conn: &mut Connection,
    sources: &[GenericPath],
    dest: &GenericPath,
    recursive: bool,
) -> Result<()> {
    tracing::debug!("generic cp of {} files to {} (recursive={})", sources.len(), dest, recursive);
    let mut local = local_connection(conn)?;
    let dest_dir = is_dir(conn, &mut local, dest).await?;
    check_batch("copy", conn, &mut local, sources, dest, dest_dir).await?;

    let (local_sources, remote_sources) = split_by_locality(sources);

    if dest.remote {
        if !remote_sources.is_empty() {
            conn.cp(&remote_sources, &dest.path, recursive).await?;
        }
        for source in &local_sources {
            let target = target_for(source, dest, dest_dir);
            if recursive {
                conn.rpush(source, &target).await?;
            } else {
                conn.push(source, &target).await?;
            }
        }
    } else {
        if !local_sources.is_empty() {
            local.cp(&local_sources, &dest.path, recursive).await?;
        }
        for source in &remote_sources {
            let target = target_for(source, dest, dest_dir);
            if recursive {
                conn.rpull(source, &target).await?;
            } else {
                conn.pull(source, &target).await?;
            }
        }
    }

    tracing::debug!("generic cp to {} is completed", dest);
    Ok(())
}

/// `mv` across sides; a transferred source is removed once its copy is complete.
pub async fn generic_mv(conn: &mut Connection, sources: &[GenericPath], dest: &GenericPath) -> Result<()> {
    tracing::debug!("generic mv of {} files to {}", sources.len(), dest);
    let mut local = local_connection(conn)?;
    let dest_dir = is_dir(conn, &mut local, dest).await?;
    check_batch("move", conn, &mut local, sources, dest, dest_dir).await?;

    let (local_sources, remote_sources) = split_by_locality(sources);

    if dest.remote {
        conn.mv(&remote_sources, &dest.path).await?;
        for source in &local_sources {
            let target = target_for(source, dest, dest_dir);
            conn.rpush(source, &target).await?;
            local.rm(source, true).await?;
        }
    } else {
        local.mv(&local_sources, &dest.path).await?;
        for source in &remote_sources {
            let target = target_for(source, dest, dest_dir);
            conn.rpull(source, &target).await?;
            conn.rm(source, true).await?;
        }
    }

    tracing::debug!("generic mv to {} is completed", dest);
    Ok(())
}

/// `rm` on each path, on its own side.
pub async fn generic_rm(conn: &mut Connection, paths: &[GenericPath], recursive: bool) -> Result<()> {
    let mut local = local_connection(conn)?;
    for target in paths {
        connection_for(conn, &mut local, target)
            .rm(&target.path, recursive)
            .await?;
    }
    Ok(())
}

/// Lists each path: directory contents, or the name of a single file.
pub async fn generic_ls(conn: &mut Connection, paths: &[GenericPath]) -> Result<Vec<(GenericPath, Vec<String>)>> {
    let mut local = local_connection(conn)?;
    let mut listings = Vec::with_capacity(paths.len());
    for target in paths {
        let entries = connection_for(conn, &mut local, target).ls(&target.path).await?;
        listings.push((target.clone(), entries));
    }
    Ok(listings)
}

/// Creates each directory; with `parents` missing ancestors too.
pub async fn generic_mkdir(conn: &mut Connection, paths: &[GenericPath], parents: bool) -> Result<()> {
    let mut local = local_connection(conn)?;
    for target in paths {
        let side = connection_for(conn, &mut local, target);
        if parents {
            side.pmkdir(&target.path).await?;
        } else {
            side.mkdir(&target.path).await?;
        }
    }
    Ok(())
}
