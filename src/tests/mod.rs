cfg_loom! {
}
