//! Content loaders: read a mod folder and write it through a [`ModContext`].
//!
//! Every loader returns how many entries it applied. Loaders whose files are
//! absent are not run at all (see [`has_content`]).

use crate::context::{AssetRef, ModContext};
use crate::error::Result;
use crate::report::ContentKind;
use lp_mod_project::content::{list_table_files, read_parameters};
use lp_mod_project::{AssetRemapFile, FileRemapFile, ModLayout};

pub fn has_content(layout: &ModLayout, kind: ContentKind) -> bool {
    match kind {
        ContentKind::FileRemaps => layout.file_remap_file().is_file(),
        ContentKind::AssetRemaps => layout.asset_remap_file().is_file(),
        ContentKind::Tables => layout.tables_dir().is_dir(),
        ContentKind::TextTables => layout.text_tables_dir().is_dir(),
        ContentKind::Parameters => layout.parameters_file().is_file(),
    }
}

pub fn load(ctx: &mut ModContext<'_>, layout: &ModLayout, kind: ContentKind) -> Result<usize> {
    match kind {
        ContentKind::FileRemaps => load_file_remaps(ctx, layout),
        ContentKind::AssetRemaps => load_asset_remaps(ctx, layout),
        ContentKind::Tables => load_tables(ctx, layout),
        ContentKind::TextTables => load_text_tables(ctx, layout),
        ContentKind::Parameters => load_parameters(ctx, layout),
    }
}

/// `FileRemap.json`. Remaps whose replacement file is missing are skipped.
pub fn load_file_remaps(ctx: &mut ModContext<'_>, layout: &ModLayout) -> Result<usize> {
    let remaps = FileRemapFile::read(&layout.file_remap_file())?;
    let files_dir = layout.files_dir();

    let mut batch = Vec::with_capacity(remaps.list_file.len());
    for remap in remaps.list_file {
        let Some(path) = remap.resolve(&files_dir) else {
            tracing::warn!(
                "Failed to remap file \"{}\" for mod \"{}\": {} points outside Files/",
                remap.file,
                ctx.id(),
                remap.new_file
            );
            continue;
        };
        if path.is_file() {
            batch.push((remap.file, path));
        } else {
            tracing::warn!(
                "Failed to remap file \"{}\" for mod \"{}\": {} does not exist",
                remap.file,
                ctx.id(),
                path
            );
        }
    }

    let count = batch.len();
    ctx.file_remaps().add_or_update_batch(batch);
    Ok(count)
}

/// `AssetRemap.json`
pub fn load_asset_remaps(ctx: &mut ModContext<'_>, layout: &ModLayout) -> Result<usize> {
    let remaps = AssetRemapFile::read(&layout.asset_remap_file())?;
    let batch: Vec<(AssetRef, AssetRef)> = remaps
        .list_asset
        .into_iter()
        .map(|r| {
            (
                AssetRef::new(r.bundle_name, r.asset_name),
                AssetRef::new(r.new_bundle_name, r.new_asset_name),
            )
        })
        .collect();

    let count = batch.len();
    ctx.asset_remaps().add_or_update_batch(batch);
    Ok(count)
}

/// `Tables/*.json`. Files naming a table the host does not have are skipped
/// with an error log; any other failure stops the loader.
pub fn load_tables(ctx: &mut ModContext<'_>, layout: &ModLayout) -> Result<usize> {
    let mut count = 0;
    for file in list_table_files(&layout.tables_dir())? {
        if !ctx.tables.contains(&file.name) {
            tracing::error!("Unknown table name {} for mod \"{}\"", file.name, ctx.id());
            continue;
        }
        let json = file.read()?;
        count += ctx.patch_table_json(&file.name, &json)?;
    }
    Ok(count)
}

/// `TextTables/<NAME>.json`, patching `<NAME>_DICT`.
pub fn load_text_tables(ctx: &mut ModContext<'_>, layout: &ModLayout) -> Result<usize> {
    let mut count = 0;
    for file in list_table_files(&layout.text_tables_dir())? {
        let table = file.text_table_name();
        if !ctx.text_tables.contains(&table) {
            tracing::error!("Unknown text table {} for mod \"{}\"", table, ctx.id());
            continue;
        }
        let json = file.read()?;
        count += ctx.patch_text_table_json(&table, &json)?;
    }
    Ok(count)
}

/// `Tables/PARAMETERS.json`
pub fn load_parameters(ctx: &mut ModContext<'_>, layout: &ModLayout) -> Result<usize> {
    let params = read_parameters(&layout.parameters_file())?;
    ctx.patch_consts(params)
}
