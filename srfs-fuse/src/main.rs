mod cli;

use std::fs;
use std::io;
use std::path::Path;

use clap::Parser;
use srfs::config::{FILE_PERM, ROOT_PERM};
use srfs::{Geometry, Inode, RamFileSystem};
use vfs::DirEntryType;

use self::cli::Cli;

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let geometry = Geometry {
        groups: cli.groups,
        inodes_per_group: cli.inodes,
        blocks_per_group: cli.blocks,
        block_size: cli.block_size,
    };

    let fs = RamFileSystem::new(geometry).map_err(io::Error::other)?;
    let root = fs.root();

    if let Some(source) = &cli.source {
        println!("source={source:?}");
        import_dir(&root, source)?;
    }

    println!("/");
    print_tree(&root, 1).map_err(io::Error::other)?;

    let statfs = fs.statfs();
    println!(
        "magic={:#x} groups={} block_size={}\ninodes: {}/{} free\nblocks: {}/{} free",
        statfs.magic,
        statfs.groups,
        statfs.block_size,
        statfs.free_inodes,
        statfs.total_inodes,
        statfs.free_blocks,
        statfs.total_blocks,
    );

    Ok(())
}

/// 把宿主目录`host`下的内容逐项复制到`dir`中
fn import_dir(dir: &Inode, host: &Path) -> io::Result<()> {
    let mut entries = fs::read_dir(host)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            log::warn!("skip {path:?}: name is not UTF-8");
            continue;
        };
        let ty = entry.file_type()?;

        if ty.is_dir() {
            match dir.mkdir(&name, ROOT_PERM) {
                Ok(sub) => import_dir(&sub, &path)?,
                Err(e) => log::warn!("skip {path:?}: {e}"),
            }
        } else if ty.is_file() {
            let data = fs::read(&path)?;
            match dir.create_file(&name, FILE_PERM) {
                Ok(inode) => import_file(&inode, &path, &data),
                Err(e) => log::warn!("skip {path:?}: {e}"),
            }
        }
    }

    Ok(())
}

fn import_file(inode: &Inode, path: &Path, data: &[u8]) {
    let mut offset = 0;
    while offset < data.len() {
        match inode.write_at(offset as u64, &data[offset..]) {
            Ok(len) => offset += len,
            Err(e) => {
                log::warn!("{path:?}: stored {offset} of {} bytes: {e}", data.len());
                return;
            }
        }
    }
    log::info!("{path:?} -> {} ({offset} bytes)", inode.id());
}

fn print_tree(dir: &Inode, depth: usize) -> Result<(), vfs::Error> {
    for entry in dir.ls()? {
        if entry.name == "." || entry.name == ".." {
            continue;
        }
        let inode = dir.lookup(&entry.name)?;
        let indent = depth * 2;
        match entry.ty {
            DirEntryType::Directory => {
                println!("{:indent$}{}/", "", entry.name);
                print_tree(&inode, depth + 1)?;
            }
            DirEntryType::Regular => {
                let stat = inode.stat()?;
                println!(
                    "{:indent$}{} ({} bytes, {} blocks)",
                    "", entry.name, stat.size, stat.blocks
                );
            }
            DirEntryType::Unknown => println!("{:indent$}{} (stale)", "", entry.name),
        }
    }
    Ok(())
}
