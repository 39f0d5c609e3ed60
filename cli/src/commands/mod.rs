mod catalog;
mod helpers;
mod ingredients;
mod pantry;
mod session;

pub(crate) use catalog::{cmd_catalog, cmd_catalog_lookup};
pub(crate) use ingredients::{
    cmd_ingredients_add, cmd_ingredients_clear, cmd_ingredients_list, cmd_ingredients_remove,
    cmd_ingredients_set,
};
pub(crate) use pantry::{
    cmd_pantry_add, cmd_pantry_clear, cmd_pantry_list, cmd_pantry_remove, cmd_pantry_rename,
};
pub(crate) use session::{cmd_reset, cmd_sync, cmd_whoami, describe_outcome};
