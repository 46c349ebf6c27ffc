fn main() {
    motion_collector_lib::run()
}
