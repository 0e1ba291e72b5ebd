fn main() {
    carepath_lib::run()
}
