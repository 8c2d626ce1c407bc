mod hoist;

clipanion::program!(HoistCli, [hoist::Hoist]);
